//! The static catalog of supported licenses.
//!
//! Every entry carries its identity fields, the reference text, a
//! case-insensitive name pattern and the two hand-authored compatibility
//! relations. The relations are asymmetric and not transitive: `A` being
//! compatible with `B` says nothing about `B` with `A`.

use std::collections::BTreeSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordinal used to pick the preferred license when several are compatible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LicensePriority {
    NoLicense = 0,
    NetworkCopyleft = 10,
    StrongCopyleft = 20,
    WeakCopyleft = 30,
    Permissive = 50,
    Recommended = 100,
}

impl LicensePriority {
    pub fn value(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SupportedLicense {
    Apache2,
    Mit,
    Bsd2Clause,
    Bsd3Clause,
    Isc,
    Wtfpl,
    Mpl2,
    Epl2,
    Cddl1,
    Lgpl21Only,
    Lgpl3Only,
    Gpl3Only,
    Agpl3Only,
    NoLicense,
}

use SupportedLicense::*;

const EVERY_LICENSE: &[SupportedLicense] = &[
    Apache2, Mit, Bsd2Clause, Bsd3Clause, Isc, Wtfpl, Mpl2, Epl2, Cddl1, Lgpl21Only, Lgpl3Only,
    Gpl3Only, Agpl3Only,
];

struct CatalogEntry {
    license: SupportedLicense,
    spdx_id: &'static str,
    name: &'static str,
    url: &'static str,
    html_url: &'static str,
    priority: LicensePriority,
    full_text: &'static str,
    name_pattern: &'static str,
    /// Module licenses under which a library carrying this license may be used.
    compatible_by_library: &'static [SupportedLicense],
    /// Parent-module licenses under which a submodule carrying this license may be nested.
    compatible_by_submodule: &'static [SupportedLicense],
}

// Indexed by enum discriminant.
static CATALOG: [CatalogEntry; 14] = [
    CatalogEntry {
        license: Apache2,
        spdx_id: "Apache-2.0",
        name: "Apache License 2.0",
        url: "https://www.apache.org/licenses/LICENSE-2.0",
        html_url: "https://choosealicense.com/licenses/apache-2.0/",
        priority: LicensePriority::Recommended,
        full_text: include_str!("../../resources/licenses/Apache-2.0.txt"),
        name_pattern: concat!(
            r"(?i)^(the\s+)?(apache([\s-]+software)?([\s-]+license)?",
            r"[\s,-]*(version|v\.?)?[\s-]*2(\.0)?",
            r"|asl[\s-]*2(\.0)?|apache-2\.0)$",
        ),
        compatible_by_library: &[
            Apache2, Mit, Bsd2Clause, Bsd3Clause, Isc, Wtfpl, Mpl2, Epl2, Cddl1, Lgpl3Only,
            Gpl3Only, Agpl3Only,
        ],
        compatible_by_submodule: &[
            Apache2, Mit, Bsd2Clause, Bsd3Clause, Isc, Wtfpl, Mpl2, Epl2, Cddl1, Lgpl3Only,
            Gpl3Only, Agpl3Only,
        ],
    },
    CatalogEntry {
        license: Mit,
        spdx_id: "MIT",
        name: "MIT License",
        url: "https://opensource.org/licenses/MIT",
        html_url: "https://choosealicense.com/licenses/mit/",
        priority: LicensePriority::Recommended,
        full_text: include_str!("../../resources/licenses/MIT.txt"),
        name_pattern: r"(?i)^(the\s+)?(mit|expat)(\s+license)?(\s+\(mit\))?$",
        compatible_by_library: EVERY_LICENSE,
        compatible_by_submodule: EVERY_LICENSE,
    },
    CatalogEntry {
        license: Bsd2Clause,
        spdx_id: "BSD-2-Clause",
        name: "BSD 2-Clause \"Simplified\" License",
        url: "https://opensource.org/licenses/BSD-2-Clause",
        html_url: "https://choosealicense.com/licenses/bsd-2-clause/",
        priority: LicensePriority::Permissive,
        full_text: include_str!("../../resources/licenses/BSD-2-Clause.txt"),
        name_pattern: r"(?i)^(bsd[\s-]*2[\s-]*clause|simplified\s+bsd|freebsd)(\s+license)?$",
        compatible_by_library: EVERY_LICENSE,
        compatible_by_submodule: EVERY_LICENSE,
    },
    CatalogEntry {
        license: Bsd3Clause,
        spdx_id: "BSD-3-Clause",
        name: "BSD 3-Clause \"New\" or \"Revised\" License",
        url: "https://opensource.org/licenses/BSD-3-Clause",
        html_url: "https://choosealicense.com/licenses/bsd-3-clause/",
        priority: LicensePriority::Permissive,
        full_text: include_str!("../../resources/licenses/BSD-3-Clause.txt"),
        name_pattern: concat!(
            r"(?i)^(bsd[\s-]*3[\s-]*clause|(new|modified|revised)\s+bsd|bsd)",
            r"(\s+license)?$",
        ),
        compatible_by_library: EVERY_LICENSE,
        compatible_by_submodule: EVERY_LICENSE,
    },
    CatalogEntry {
        license: Isc,
        spdx_id: "ISC",
        name: "ISC License",
        url: "https://opensource.org/licenses/ISC",
        html_url: "https://choosealicense.com/licenses/isc/",
        priority: LicensePriority::Permissive,
        full_text: include_str!("../../resources/licenses/ISC.txt"),
        name_pattern: r"(?i)^isc(\s+license)?$",
        compatible_by_library: EVERY_LICENSE,
        compatible_by_submodule: EVERY_LICENSE,
    },
    CatalogEntry {
        license: Wtfpl,
        spdx_id: "WTFPL",
        name: "Do What The F*ck You Want To Public License",
        url: "http://www.wtfpl.net/about/",
        html_url: "https://choosealicense.com/licenses/wtfpl/",
        priority: LicensePriority::Permissive,
        full_text: include_str!("../../resources/licenses/WTFPL.txt"),
        name_pattern: concat!(
            r"(?i)^(wtfpl(\s+2(\.0)?)?",
            r"|do\s+what\s+the\s+f\S{0,3}k\s+you\s+want\s+to\s+public\s+license)$",
        ),
        compatible_by_library: EVERY_LICENSE,
        compatible_by_submodule: EVERY_LICENSE,
    },
    CatalogEntry {
        license: Mpl2,
        spdx_id: "MPL-2.0",
        name: "Mozilla Public License 2.0",
        url: "https://www.mozilla.org/en-US/MPL/2.0/",
        html_url: "https://choosealicense.com/licenses/mpl-2.0/",
        priority: LicensePriority::WeakCopyleft,
        full_text: include_str!("../../resources/licenses/MPL-2.0.txt"),
        name_pattern: concat!(
            r"(?i)^(mpl[\s-]*2(\.0)?",
            r"|mozilla\s+public\s+license[\s,]*(version|v\.?)?\s*2(\.0)?)$",
        ),
        compatible_by_library: EVERY_LICENSE,
        compatible_by_submodule: &[
            Apache2, Mit, Bsd2Clause, Bsd3Clause, Isc, Wtfpl, Mpl2, Lgpl21Only, Lgpl3Only,
            Gpl3Only, Agpl3Only,
        ],
    },
    CatalogEntry {
        license: Epl2,
        spdx_id: "EPL-2.0",
        name: "Eclipse Public License 2.0",
        url: "https://www.eclipse.org/legal/epl-2.0/",
        html_url: "https://choosealicense.com/licenses/epl-2.0/",
        priority: LicensePriority::WeakCopyleft,
        full_text: include_str!("../../resources/licenses/EPL-2.0.txt"),
        name_pattern: concat!(
            r"(?i)^(epl[\s-]*2(\.0)?",
            r"|eclipse\s+public\s+license[\s,-]*(version|v\.?)?\s*2(\.0)?)$",
        ),
        compatible_by_library: &[
            Apache2, Mit, Bsd2Clause, Bsd3Clause, Isc, Wtfpl, Mpl2, Epl2, Cddl1,
        ],
        compatible_by_submodule: &[Epl2],
    },
    CatalogEntry {
        license: Cddl1,
        spdx_id: "CDDL-1.0",
        name: "Common Development and Distribution License 1.0",
        url: "https://opensource.org/licenses/CDDL-1.0",
        html_url: "https://spdx.org/licenses/CDDL-1.0.html",
        priority: LicensePriority::WeakCopyleft,
        full_text: include_str!("../../resources/licenses/CDDL-1.0.txt"),
        name_pattern: concat!(
            r"(?i)^(cddl[\s-]*1(\.0)?",
            r"|common\s+development\s+and\s+distribution\s+license(\s+\(cddl\))?",
            r"[\s,-]*(version|v\.?)?\s*1(\.0)?)$",
        ),
        compatible_by_library: &[
            Apache2, Mit, Bsd2Clause, Bsd3Clause, Isc, Wtfpl, Mpl2, Epl2, Cddl1,
        ],
        compatible_by_submodule: &[Cddl1],
    },
    CatalogEntry {
        license: Lgpl21Only,
        spdx_id: "LGPL-2.1-only",
        name: "GNU Lesser General Public License v2.1 only",
        url: "https://www.gnu.org/licenses/old-licenses/lgpl-2.1.html",
        html_url: "https://choosealicense.com/licenses/lgpl-2.1/",
        priority: LicensePriority::WeakCopyleft,
        full_text: include_str!("../../resources/licenses/LGPL-2.1-only.txt"),
        name_pattern: concat!(
            r"(?i)^(lgpl[\s-]*v?2\.1(-only)?",
            r"|gnu\s+lesser\s+general\s+public\s+license[\s,]*(version|v\.?)?\s*2\.1(\s+only)?)$",
        ),
        compatible_by_library: &[
            Apache2, Mit, Bsd2Clause, Bsd3Clause, Isc, Wtfpl, Mpl2, Epl2, Cddl1, Lgpl21Only,
        ],
        compatible_by_submodule: &[Lgpl21Only],
    },
    CatalogEntry {
        license: Lgpl3Only,
        spdx_id: "LGPL-3.0-only",
        name: "GNU Lesser General Public License v3.0 only",
        url: "https://www.gnu.org/licenses/lgpl-3.0.html",
        html_url: "https://choosealicense.com/licenses/lgpl-3.0/",
        priority: LicensePriority::WeakCopyleft,
        full_text: include_str!("../../resources/licenses/LGPL-3.0-only.txt"),
        name_pattern: concat!(
            r"(?i)^(lgpl[\s-]*v?3(\.0)?(-only)?",
            r"|gnu\s+lesser\s+general\s+public\s+license",
            r"[\s,]*(version|v\.?)?\s*3(\.0)?(\s+only)?)$",
        ),
        compatible_by_library: &[
            Apache2, Mit, Bsd2Clause, Bsd3Clause, Isc, Wtfpl, Mpl2, Epl2, Cddl1, Lgpl3Only,
            Gpl3Only, Agpl3Only,
        ],
        compatible_by_submodule: &[Lgpl3Only, Gpl3Only, Agpl3Only],
    },
    CatalogEntry {
        license: Gpl3Only,
        spdx_id: "GPL-3.0-only",
        name: "GNU General Public License v3.0 only",
        url: "https://www.gnu.org/licenses/gpl-3.0.html",
        html_url: "https://choosealicense.com/licenses/gpl-3.0/",
        priority: LicensePriority::StrongCopyleft,
        full_text: include_str!("../../resources/licenses/GPL-3.0-only.txt"),
        name_pattern: concat!(
            r"(?i)^(gpl[\s-]*v?3(\.0)?(-only)?",
            r"|gnu\s+general\s+public\s+license[\s,]*(version|v\.?)?\s*3(\.0)?(\s+only)?)$",
        ),
        compatible_by_library: &[Gpl3Only, Agpl3Only],
        compatible_by_submodule: &[Gpl3Only, Agpl3Only],
    },
    CatalogEntry {
        license: Agpl3Only,
        spdx_id: "AGPL-3.0-only",
        name: "GNU Affero General Public License v3.0 only",
        url: "https://www.gnu.org/licenses/agpl-3.0.html",
        html_url: "https://choosealicense.com/licenses/agpl-3.0/",
        priority: LicensePriority::NetworkCopyleft,
        full_text: include_str!("../../resources/licenses/AGPL-3.0-only.txt"),
        name_pattern: concat!(
            r"(?i)^(agpl[\s-]*v?3(\.0)?(-only)?",
            r"|gnu\s+affero\s+general\s+public\s+license",
            r"[\s,]*(version|v\.?)?\s*3(\.0)?(\s+only)?)$",
        ),
        compatible_by_library: &[Agpl3Only],
        compatible_by_submodule: &[Agpl3Only],
    },
    CatalogEntry {
        license: NoLicense,
        spdx_id: "NOASSERTION",
        name: "No License",
        url: "",
        html_url: "",
        priority: LicensePriority::NoLicense,
        full_text: "",
        name_pattern: r"^$",
        compatible_by_library: &[],
        compatible_by_submodule: &[],
    },
];

static NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    CATALOG
        .iter()
        .map(|entry| Regex::new(entry.name_pattern).expect("catalog name pattern is valid"))
        .collect()
});

impl SupportedLicense {
    /// The full catalog including the `NoLicense` sentinel, in tie-break order.
    pub const ALL: [SupportedLicense; 14] = [
        Apache2, Mit, Bsd2Clause, Bsd3Clause, Isc, Wtfpl, Mpl2, Epl2, Cddl1, Lgpl21Only,
        Lgpl3Only, Gpl3Only, Agpl3Only, NoLicense,
    ];

    /// Every real catalog license, without the sentinel.
    pub fn known() -> impl Iterator<Item = SupportedLicense> {
        EVERY_LICENSE.iter().copied()
    }

    fn entry(self) -> &'static CatalogEntry {
        &CATALOG[self as usize]
    }

    pub fn spdx_id(self) -> &'static str {
        self.entry().spdx_id
    }

    pub fn name(self) -> &'static str {
        self.entry().name
    }

    pub fn url(self) -> &'static str {
        self.entry().url
    }

    pub fn html_url(self) -> &'static str {
        self.entry().html_url
    }

    pub fn priority(self) -> LicensePriority {
        self.entry().priority
    }

    pub fn full_text(self) -> &'static str {
        self.entry().full_text
    }

    /// Whether `name` is one of the free-text spellings of this license.
    pub fn matches_name(self, name: &str) -> bool {
        self != NoLicense && NAME_PATTERNS[self as usize].is_match(name.trim())
    }

    pub fn compatible_module_licenses_by_library_license(self) -> BTreeSet<SupportedLicense> {
        self.entry().compatible_by_library.iter().copied().collect()
    }

    pub fn compatible_module_licenses_by_submodule_license(self) -> BTreeSet<SupportedLicense> {
        self.entry().compatible_by_submodule.iter().copied().collect()
    }

    /// `module` may use a library carrying `self`.
    pub fn allows_module_as_library(self, module: SupportedLicense) -> bool {
        self.entry().compatible_by_library.contains(&module)
    }

    /// `parent` may contain a submodule carrying `self`.
    pub fn allows_parent_as_submodule(self, parent: SupportedLicense) -> bool {
        self.entry().compatible_by_submodule.contains(&parent)
    }

    /// Exact, case-insensitive SPDX id lookup.
    pub fn from_spdx_id(id: &str) -> Option<SupportedLicense> {
        let id = id.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|l| l.spdx_id().eq_ignore_ascii_case(id))
    }
}

/// Sort descending by priority; equal priorities keep catalog order.
pub fn sort_by_priority(licenses: &mut [SupportedLicense]) {
    licenses.sort_by(|a, b| {
        b.priority()
            .value()
            .cmp(&a.priority().value())
            .then(a.cmp(b))
    });
}

impl fmt::Display for SupportedLicense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Serialize for SupportedLicense {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.spdx_id())
    }
}

impl<'de> Deserialize<'de> for SupportedLicense {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = String::deserialize(deserializer)?;
        SupportedLicense::from_spdx_id(&id)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown license id `{}`", id)))
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpotClass {
    Reject,
    Singlet,
    DoubletCertain,
    DoubletUncertain,
}

impl SpotClass {
    pub fn as_str(self) -> &'static str {
        match self {
            SpotClass::Reject => "reject",
            SpotClass::Singlet => "singlet",
            SpotClass::DoubletCertain => "doublet_certain",
            SpotClass::DoubletUncertain => "doublet_uncertain",
        }
    }

    pub fn is_doublet(self) -> bool {
        matches!(self, SpotClass::DoubletCertain | SpotClass::DoubletUncertain)
    }
}

impl fmt::Display for SpotClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// stable reporting order
pub fn spot_class_order() -> &'static [SpotClass] {
    &[
        SpotClass::Reject,
        SpotClass::Singlet,
        SpotClass::DoubletCertain,
        SpotClass::DoubletUncertain,
    ]
}

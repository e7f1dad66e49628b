use serde::{Deserialize, Serialize};

// -------------------------------------------------------------------------------------------------
// SourceUnit
// -------------------------------------------------------------------------------------------------
/// One lexical block of ABAP source to scan: a program, an include, a class method, etc.
///
/// Units are constructed by the caller from a source inventory and are immutable during
/// remediation. All fields other than `code` are echoed untouched into the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    /// The name of the enclosing program
    pub pgm_name: String,

    /// The name of the include this unit came from
    pub inc_name: String,

    /// The kind of unit: `PROG`, `INCL`, `METH`, ...
    #[serde(rename = "type")]
    pub unit_type: String,

    /// The name of the unit itself, when it has one
    #[serde(default)]
    pub name: Option<String>,

    /// The enclosing class, for method units
    #[serde(default)]
    pub class_implementation: Option<String>,

    /// 1-based first line of the unit within its parent file
    #[serde(default)]
    pub start_line: Option<u32>,

    /// 1-based last line of the unit within its parent file
    #[serde(default)]
    pub end_line: Option<u32>,

    /// The unit's source text; absent code is treated as empty
    #[serde(default)]
    pub code: String,
}

impl SourceUnit {
    /// A short human-readable identifier for diagnostics.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => format!("{}/{} ({})", self.pgm_name, self.inc_name, name),
            None => format!("{}/{}", self.pgm_name, self.inc_name),
        }
    }
}

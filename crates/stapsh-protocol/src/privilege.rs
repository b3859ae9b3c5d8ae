use serde::{Deserialize, Serialize};
use std::fmt;

/// Privilege levels a compiled module may require, as a bit set.
///
/// The numeric values end up inside generated modules and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Privilege(u32);

impl Privilege {
    pub const NONE: Privilege = Privilege(0x0000_0000);
    pub const UNKNOWN: Privilege = Privilege(0x0000_0001);
    pub const STAPUSR: Privilege = Privilege(0x0000_0002);
    pub const STAPSYS: Privilege = Privilege(0x0000_0004);
    pub const STAPDEV: Privilege = Privilege(0x0000_0008);
    pub const ALL: Privilege = Privilege(0x0000_0002 | 0x0000_0004 | 0x0000_0008);

    /// First level of the iteration order.
    pub const BEGIN: Privilege = Privilege::STAPUSR;
    /// Sentinel returned by [`Privilege::next`] once the levels are exhausted.
    pub const END: Privilege = Privilege::UNKNOWN;

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        Privilege(bits)
    }

    pub fn next(self) -> Privilege {
        match self {
            Privilege::STAPUSR => Privilege::STAPSYS,
            Privilege::STAPSYS => Privilege::STAPDEV,
            _ => Privilege::END,
        }
    }

    /// Iterates the concrete levels, lowest first.
    pub fn levels() -> impl Iterator<Item = Privilege> {
        std::iter::successors(Some(Privilege::BEGIN), |p| {
            let next = p.next();
            (next != Privilege::END).then_some(next)
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Privilege::NONE => "none",
            Privilege::STAPUSR => "stapusr",
            Privilege::STAPSYS => "stapsys",
            Privilege::STAPDEV => "stapdev",
            _ => "unknown",
        }
    }

    pub fn from_name(name: &str) -> Option<Privilege> {
        match name {
            "stapusr" => Some(Privilege::STAPUSR),
            "stapsys" => Some(Privilege::STAPSYS),
            "stapdev" => Some(Privilege::STAPDEV),
            _ => None,
        }
    }

    /// True when every bit of `required` is present in `self`.
    pub fn contains(self, required: Privilege) -> bool {
        self.0 & required.0 == required.0
    }

    pub fn union(self, other: Privilege) -> Privilege {
        Privilege(self.0 | other.0)
    }
}

impl Default for Privilege {
    fn default() -> Self {
        Privilege::STAPDEV
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_iterate_in_order() {
        let names: Vec<&str> = Privilege::levels().map(Privilege::name).collect();
        assert_eq!(names, vec!["stapusr", "stapsys", "stapdev"]);
    }

    #[test]
    fn all_contains_every_level() {
        for level in Privilege::levels() {
            assert!(Privilege::ALL.contains(level));
        }
        assert!(!Privilege::STAPUSR.contains(Privilege::STAPDEV));
        assert!(Privilege::STAPUSR.contains(Privilege::NONE));
    }

    #[test]
    fn name_round_trip() {
        for level in Privilege::levels() {
            assert_eq!(Privilege::from_name(level.name()), Some(level));
        }
        assert_eq!(Privilege::from_name("root"), None);
        assert_eq!(Privilege::UNKNOWN.name(), "unknown");
    }

    #[test]
    fn union_builds_sets() {
        let set = Privilege::STAPUSR.union(Privilege::STAPSYS);
        assert!(set.contains(Privilege::STAPSYS));
        assert!(!set.contains(Privilege::ALL));
        assert_eq!(set.union(Privilege::STAPDEV), Privilege::ALL);
    }
}

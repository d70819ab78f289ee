//! Clocking schemes for FCN layouts.
//!
//! A clocking scheme maps every coordinate to a clock phase in `0..N` where
//! `N` is the phase count (3 or 4 in all schemes from the literature). Data
//! flows only from a tile in phase `n` to an adjacent tile in phase
//! `(n + 1) mod N`. *Regular* schemes compute the phase from a periodic
//! cutout table; *open* schemes store an explicit per-coordinate
//! assignment.

use hashbrown::HashMap;

use crate::coords::Coord;

/// The periodic phase assignment of the 3-phase 2DDWave scheme.
static TWODDWAVE_3: &[&[u8]] = &[&[0, 1, 2], &[1, 2, 0], &[2, 0, 1]];
/// The periodic phase assignment of the 4-phase 2DDWave scheme.
static TWODDWAVE_4: &[&[u8]] = &[
    &[0, 1, 2, 3],
    &[1, 2, 3, 0],
    &[2, 3, 0, 1],
    &[3, 0, 1, 2],
];
/// The periodic phase assignment of the USE scheme.
static USE: &[&[u8]] = &[
    &[0, 1, 2, 3],
    &[3, 2, 1, 0],
    &[2, 3, 0, 1],
    &[1, 0, 3, 2],
];
/// The periodic phase assignment of the RES scheme.
static RES: &[&[u8]] = &[
    &[3, 0, 1, 2],
    &[0, 1, 0, 3],
    &[1, 2, 3, 0],
    &[0, 3, 2, 1],
];
/// The periodic phase assignment of the BANCS scheme.
static BANCS: &[&[u8]] = &[
    &[0, 1, 2],
    &[2, 1, 0],
    &[2, 0, 1],
    &[1, 0, 2],
    &[1, 2, 0],
    &[0, 2, 1],
];
/// Columnar phase assignments (ToPoliNano).
static COLUMNAR_3: &[&[u8]] = &[&[0, 1, 2]];
static COLUMNAR_4: &[&[u8]] = &[&[0, 1, 2, 3]];
/// Row-based phase assignment (Bestagon, on hexagonal grids).
static ROW_4: &[&[u8]] = &[&[0], &[1], &[2], &[3]];

#[derive(Clone, Debug, PartialEq, Eq)]
enum SchemeKind {
    /// Phase is `cutout[y % rows][x % columns]`.
    Regular { cutout: &'static [&'static [u8]] },
    /// Phase is stored per ground-layer position; unassigned positions
    /// default to phase 0.
    Open { zones: HashMap<(u32, u32), u8> },
}

/// A clocking scheme: a name, a phase count, and a phase assignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClockingScheme {
    name: &'static str,
    num_phases: u8,
    kind: SchemeKind,
}

impl ClockingScheme {
    fn regular(name: &'static str, num_phases: u8, cutout: &'static [&'static [u8]]) -> Self {
        ClockingScheme {
            name,
            num_phases,
            kind: SchemeKind::Regular { cutout },
        }
    }

    /// The diagonal 2DDWave scheme with `n` phases (3 or 4). Data flows
    /// strictly east- and southwards, which makes the scheme feedback-free.
    pub fn twoddwave(n: u8) -> Self {
        match n {
            3 => Self::regular("2DDWave3", 3, TWODDWAVE_3),
            _ => Self::regular("2DDWave", 4, TWODDWAVE_4),
        }
    }

    /// The 4-phase USE scheme.
    pub fn use_scheme() -> Self {
        Self::regular("USE", 4, USE)
    }

    /// The 4-phase RES scheme. RES is the only named scheme whose tiles can
    /// take the three inputs a MAJ gate requires.
    pub fn res() -> Self {
        Self::regular("RES", 4, RES)
    }

    /// The 3-phase BANCS scheme.
    pub fn bancs() -> Self {
        Self::regular("BANCS", 3, BANCS)
    }

    /// The columnar ToPoliNano scheme with `n` phases (3 or 4). Data flows
    /// strictly eastwards.
    pub fn topolinano(n: u8) -> Self {
        match n {
            3 => Self::regular("ToPoliNano3", 3, COLUMNAR_3),
            _ => Self::regular("ToPoliNano4", 4, COLUMNAR_4),
        }
    }

    /// The row-based 4-phase Bestagon scheme for hexagonal layouts.
    pub fn bestagon() -> Self {
        Self::regular("Bestagon", 4, ROW_4)
    }

    /// An open scheme with `n` phases and an initially empty per-coordinate
    /// assignment.
    pub fn open(n: u8) -> Self {
        ClockingScheme {
            name: "OPEN",
            num_phases: n,
            kind: SchemeKind::Open {
                zones: HashMap::new(),
            },
        }
    }

    /// Looks a scheme up by its name, as used in FGL files.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "2DDWave" | "2DDWave4" => Some(Self::twoddwave(4)),
            "2DDWave3" => Some(Self::twoddwave(3)),
            "USE" => Some(Self::use_scheme()),
            "RES" => Some(Self::res()),
            "BANCS" => Some(Self::bancs()),
            "ToPoliNano3" => Some(Self::topolinano(3)),
            "ToPoliNano" | "ToPoliNano4" => Some(Self::topolinano(4)),
            "Bestagon" => Some(Self::bestagon()),
            "OPEN" | "OPEN3" => Some(Self::open(3)),
            "OPEN4" => Some(Self::open(4)),
            _ => None,
        }
    }

    /// The scheme's name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The number of clock phases.
    #[inline]
    pub fn num_phases(&self) -> u8 {
        self.num_phases
    }

    /// `true` iff the phase assignment is computed from a periodic table
    /// rather than stored per coordinate.
    #[inline]
    pub fn is_regular(&self) -> bool {
        matches!(self.kind, SchemeKind::Regular { .. })
    }

    /// `true` iff the scheme admits no data-flow cycles by construction
    /// (2DDWave, ToPoliNano, and Bestagon flow strictly towards one corner
    /// or border).
    pub fn is_feedback_free(&self) -> bool {
        matches!(
            self.name,
            "2DDWave" | "2DDWave3" | "2DDWave4" | "ToPoliNano3" | "ToPoliNano4" | "Bestagon"
        )
    }

    /// `true` iff tiles of this scheme can take the three inputs a MAJ gate
    /// requires. Among the named schemes, only RES qualifies; open schemes
    /// are unrestricted.
    pub fn allows_majority_gates(&self) -> bool {
        self.name == "RES" || !self.is_regular()
    }

    /// The clock phase of coordinate `c`. The crossing layer mirrors the
    /// ground layer.
    pub fn phase(&self, c: Coord) -> u8 {
        match &self.kind {
            SchemeKind::Regular { cutout } => {
                let row = cutout[(c.y as usize) % cutout.len()];
                row[(c.x as usize) % row.len()]
            }
            SchemeKind::Open { zones } => zones.get(&(c.x, c.y)).copied().unwrap_or(0),
        }
    }

    /// Assigns phase `phase` to coordinate `c` in an open scheme. Has no
    /// effect on regular schemes.
    pub fn assign_phase(&mut self, c: Coord, phase: u8) {
        if let SchemeKind::Open { zones } = &mut self.kind {
            zones.insert((c.x, c.y), phase % self.num_phases);
        }
    }

    /// The explicitly assigned zones of an open scheme, sorted by position.
    /// Empty for regular schemes.
    pub fn zones(&self) -> Vec<(u32, u32, u8)> {
        match &self.kind {
            SchemeKind::Regular { .. } => Vec::new(),
            SchemeKind::Open { zones } => {
                let mut v: Vec<_> = zones.iter().map(|(&(x, y), &p)| (x, y, p)).collect();
                v.sort_unstable();
                v
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twoddwave_phases() {
        let s = ClockingScheme::twoddwave(3);
        assert_eq!(s.num_phases(), 3);
        assert_eq!(s.phase(Coord::new(0, 0)), 0);
        assert_eq!(s.phase(Coord::new(1, 0)), 1);
        assert_eq!(s.phase(Coord::new(0, 1)), 1);
        assert_eq!(s.phase(Coord::new(2, 2)), 1);
        // crossing layer mirrors ground
        assert_eq!(s.phase(Coord::with_z(2, 2, 1)), 1);
    }

    #[test]
    fn open_assignment() {
        let mut s = ClockingScheme::open(4);
        assert!(!s.is_regular());
        s.assign_phase(Coord::new(1, 2), 3);
        assert_eq!(s.phase(Coord::new(1, 2)), 3);
        assert_eq!(s.phase(Coord::new(0, 0)), 0);
    }

    #[test]
    fn majority_support() {
        assert!(ClockingScheme::res().allows_majority_gates());
        assert!(!ClockingScheme::twoddwave(4).allows_majority_gates());
        assert!(ClockingScheme::open(3).allows_majority_gates());
    }

    #[test]
    fn name_lookup_round_trips() {
        for name in ["2DDWave", "2DDWave3", "USE", "RES", "BANCS", "Bestagon"] {
            let s = ClockingScheme::by_name(name).unwrap();
            assert_eq!(s.name(), name);
        }
    }
}

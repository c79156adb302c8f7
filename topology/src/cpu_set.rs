//! Sets of processing units, rendered and parsed in Linux cpulist form.

use {
    crate::error::TopologyError,
    std::{collections::BTreeSet, fmt, str::FromStr},
};

/// An ordered set of processing-unit ids.
///
/// This is the currency of the whole crate: topology objects describe the
/// PUs beneath them as a `CpuSet`, and affinity get/set operations consume
/// and produce one. Ids are kept sorted, so iteration and rendering are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuSet {
    cpus: BTreeSet<usize>,
}

impl CpuSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cpu: usize) -> bool {
        self.cpus.insert(cpu)
    }

    pub fn contains(&self, cpu: usize) -> bool {
        self.cpus.contains(&cpu)
    }

    pub fn len(&self) -> usize {
        self.cpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpus.is_empty()
    }

    /// True iff every PU in `self` is also in `other`.
    pub fn is_subset(&self, other: &CpuSet) -> bool {
        self.cpus.is_subset(&other.cpus)
    }

    /// True iff `self` is a subset of `other` and strictly smaller.
    pub fn is_proper_subset(&self, other: &CpuSet) -> bool {
        self.len() < other.len() && self.is_subset(other)
    }

    pub fn union(&self, other: &CpuSet) -> CpuSet {
        CpuSet {
            cpus: self.cpus.union(&other.cpus).copied().collect(),
        }
    }

    /// PU ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.cpus.iter().copied()
    }

    pub fn first(&self) -> Option<usize> {
        self.cpus.first().copied()
    }

    pub fn max(&self) -> Option<usize> {
        self.cpus.last().copied()
    }
}

impl FromIterator<usize> for CpuSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        CpuSet {
            cpus: iter.into_iter().collect(),
        }
    }
}

/// Renders in the kernel's cpulist format: ascending, ranges collapsed
/// (e.g. "0-3,8,10-11"). The empty set renders as "".
impl fmt::Display for CpuSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut iter = self.cpus.iter().copied().peekable();
        while let Some(start) = iter.next() {
            let mut end = start;
            while let Some(&next) = iter.peek() {
                if next != end + 1 {
                    break;
                }
                end = next;
                iter.next();
            }
            if !first {
                write!(f, ",")?;
            }
            first = false;
            if start == end {
                write!(f, "{start}")?;
            } else {
                write!(f, "{start}-{end}")?;
            }
        }
        Ok(())
    }
}

/// Parses the kernel's cpulist format (e.g. "0-3,5,7-9"). Whitespace around
/// parts is tolerated, duplicates collapse, empty parts are skipped.
impl FromStr for CpuSet {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut cpus = BTreeSet::new();

        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            if let Some((start_str, end_str)) = part.split_once('-') {
                let start = start_str.trim().parse::<usize>().map_err(|_| {
                    TopologyError::Parse(format!("invalid CPU range: {part}"))
                })?;
                let end = end_str.trim().parse::<usize>().map_err(|_| {
                    TopologyError::Parse(format!("invalid CPU range: {part}"))
                })?;
                cpus.extend(start..=end);
            } else {
                let cpu = part
                    .parse::<usize>()
                    .map_err(|_| TopologyError::Parse(format!("invalid CPU id: {part}")))?;
                cpus.insert(cpu);
            }
        }

        Ok(CpuSet { cpus })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(cpus: &[usize]) -> CpuSet {
        cpus.iter().copied().collect()
    }

    #[test]
    fn test_parse_cpulist() {
        assert_eq!("0".parse::<CpuSet>().unwrap(), set(&[0]));
        assert_eq!("0-3".parse::<CpuSet>().unwrap(), set(&[0, 1, 2, 3]));
        assert_eq!(
            "0-2,5,7-9".parse::<CpuSet>().unwrap(),
            set(&[0, 1, 2, 5, 7, 8, 9])
        );

        // Spaces and empty parts are tolerated
        assert_eq!(
            " 0 - 2 , 5 , 7 - 9 ".parse::<CpuSet>().unwrap(),
            set(&[0, 1, 2, 5, 7, 8, 9])
        );
        assert_eq!("0,,2".parse::<CpuSet>().unwrap(), set(&[0, 2]));

        // Duplicates collapse
        assert_eq!("0,1,0,2,1".parse::<CpuSet>().unwrap(), set(&[0, 1, 2]));

        // Degenerate cases
        assert_eq!("".parse::<CpuSet>().unwrap(), CpuSet::new());
        assert_eq!("3-3".parse::<CpuSet>().unwrap(), set(&[3]));
    }

    #[test]
    fn test_parse_cpulist_errors() {
        assert!("abc".parse::<CpuSet>().is_err());
        assert!("0-abc".parse::<CpuSet>().is_err());
        assert!("abc-5".parse::<CpuSet>().is_err());
        assert!("-5".parse::<CpuSet>().is_err());
        assert!("5-".parse::<CpuSet>().is_err());
        assert!("--".parse::<CpuSet>().is_err());
    }

    #[test]
    fn test_display_collapses_ranges() {
        assert_eq!(set(&[0]).to_string(), "0");
        assert_eq!(set(&[0, 1, 2, 3]).to_string(), "0-3");
        assert_eq!(set(&[0, 1, 2, 5, 7, 8, 9]).to_string(), "0-2,5,7-9");
        assert_eq!(set(&[4, 6]).to_string(), "4,6");
        assert_eq!(CpuSet::new().to_string(), "");
    }

    #[test]
    fn test_display_parse_duals() {
        for cpus in [
            vec![0],
            vec![0, 1, 2, 3],
            vec![0, 2, 4, 5, 6, 11],
            vec![3, 9, 10],
        ] {
            let original = set(&cpus);
            let round: CpuSet = original.to_string().parse().unwrap();
            assert_eq!(round, original);
        }
    }

    #[test]
    fn test_subset_relations() {
        let all = set(&[0, 1, 2, 3]);
        let half = set(&[0, 1]);

        assert!(half.is_subset(&all));
        assert!(half.is_proper_subset(&all));
        assert!(all.is_subset(&all));
        assert!(!all.is_proper_subset(&all));
        assert!(!all.is_subset(&half));
    }

    #[test]
    fn test_union_and_iteration_order() {
        let a = set(&[5, 1]);
        let b = set(&[3, 1]);
        let u = a.union(&b);
        assert_eq!(u.iter().collect::<Vec<_>>(), vec![1, 3, 5]);
    }
}

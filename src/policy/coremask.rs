//! Core range to affinity mask translation
//!
//! Turns the human-readable core ranges of an affinity preset into the
//! bitmask `SetProcessAffinityMask` expects, plus a one-line diagram used
//! by the enforcement digest.

/// A single `[start, end]` entry of an affinity preset.
/// `end == None` selects only `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreRange {
    pub start: u32,
    pub end: Option<u32>,
}

impl CoreRange {
    pub fn single(core: u32) -> Self {
        Self { start: core, end: None }
    }

    pub fn span(start: u32, end: u32) -> Self {
        Self { start, end: Some(end) }
    }

    /// Highest core index this range selects.
    pub fn last(&self) -> u32 {
        self.end.unwrap_or(self.start).max(self.start)
    }
}

/// A translated affinity: the mask and its printable diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreMask {
    pub mask: usize,
    pub graph: String,
}

/// Processor layout the translator works against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTopology {
    pub logical_cores: u32,
    pub physical_cores: u32,
}

impl CpuTopology {
    /// Hyperthreading is assumed whenever the counts differ.
    pub fn hyperthreading(&self) -> bool {
        self.physical_cores != self.logical_cores
    }

    pub fn translate(&self, ranges: &[CoreRange]) -> CoreMask {
        translate(ranges, self.hyperthreading(), self.logical_cores)
    }

    /// Mask covering every physical core and, with hyperthreading, their siblings.
    pub fn full_mask(&self) -> usize {
        let last = self.physical_cores.saturating_sub(1);
        self.translate(&[CoreRange::span(0, last)]).mask
    }
}

/// Translates core ranges into an affinity mask and diagram.
///
/// # Arguments
/// * `ranges` - Inclusive core ranges, in preset order
/// * `use_logical_siblings` - Also select the hyperthread sibling
///   (`core + total / 2`) of every selected core
/// * `total_core_count` - Number of logical processors on the system
///
/// The sibling pass stops at the first sibling that is out of range or
/// already selected, so non-contiguous presets may get fewer siblings.
/// The diagram has one cell per physical core when siblings are used
/// (siblings are implied), one per logical core otherwise.
pub fn translate(ranges: &[CoreRange], use_logical_siblings: bool, total_core_count: u32) -> CoreMask {
    let mut cores: Vec<u32> = Vec::new();

    for range in ranges {
        match range.end {
            Some(end) if end > 0 => cores.extend(range.start..=end),
            _ => cores.push(range.start),
        }
    }

    if use_logical_siblings {
        let selected = cores.clone();
        let half = total_core_count / 2;

        for core in &selected {
            let sibling = core + half;

            if sibling + 1 > total_core_count || selected.contains(&sibling) {
                break;
            }

            cores.push(sibling);
        }
    }

    let mask = cores
        .iter()
        .filter(|&&core| core < usize::BITS)
        .fold(0usize, |mask, &core| mask | (1usize << core));

    let cells = if use_logical_siblings {
        total_core_count / 2
    } else {
        total_core_count
    };

    let graph = (0..cells)
        .map(|core| {
            if cores.contains(&core) {
                format!("{:>2}", core)
            } else {
                "--".to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("|");

    CoreMask {
        mask,
        graph: format!("[{}]", graph),
    }
}

//! Ajuste de padrões físicos de fatias de cache
//!
//! Cada cache tem 4 fatias e só alguns padrões globais de desabilitação são
//! legais: todas as caches habilitadas perdem a mesma quantidade de fatias,
//! com o padrão base girando uma posição a cada cache.
//!
//! ```text
//!   cache:    0      1      2      3
//!   0b0001:  ...x   ..x.   .x..   x...     (3 fatias por cache)
//!   0b0011:  ..xx   .xx.   xx..   x..x     (2 fatias por cache)
//! ```

use std::collections::BTreeMap;
use tracing::debug;
use downbin_core::prelude::*;

const SLICES_PER_CACHE: u32 = 4;
const CACHE_MASK: u32 = 0b1111;

/// Padrões base, na ordem de tentativa
const PATTERNS: [u32; 2] = [0b0001, 0b0011];

/// Cache habilitada e suas fatias já desabilitadas
#[derive(Debug, Clone, Copy)]
struct Cache {
    group: usize,
    index: u32,
    disabled: u32,
}

impl Cache {
    fn is_partial(&self) -> bool {
        self.disabled != 0 && self.disabled != CACHE_MASK
    }
}

fn rotl4(pattern: u32, by: u32) -> u32 {
    let by = by % SLICES_PER_CACHE;
    ((pattern << by) | (pattern >> (SLICES_PER_CACHE - by))) & CACHE_MASK
}

/// Regra global, sem gatilhos: executada com `Chip::run_rule` depois do laço guloso
#[derive(Debug, Clone)]
pub struct SlicePatternRule {
    set: UnitKind,
    cache: UnitKind,
    slice: UnitKind,
    required: bool,
    max_enabled: Option<u32>,
}

impl SlicePatternRule {
    pub fn new(set: UnitKind, cache: UnitKind, slice: UnitKind) -> Self {
        Self { set, cache, slice, required: false, max_enabled: None }
    }

    /// Aplica um padrão mesmo sem fatias defeituosas
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Só aceita padrões que deixem no máximo `max` fatias habilitadas
    pub fn max_enabled(mut self, max: u32) -> Self {
        self.required = true;
        self.max_enabled = Some(max);
        self
    }

    fn enabled_caches(&self, chip: &Chip) -> FsResult<Vec<Cache>> {
        let set = chip.set(self.set)?;
        let slice_len = set.slice_len(self.cache, self.slice)?;
        if slice_len != SLICES_PER_CACHE {
            return Err(FsError::InvalidArgument(format!(
                "{} holds {slice_len} {} each, slice patterns need {SLICES_PER_CACHE}",
                self.cache, self.slice
            )));
        }

        let mut caches = Vec::new();
        for group in set.groups().iter().filter(|g| !g.is_disabled()) {
            let slices = set.element_set_in(group.index(), self.slice)?.total_disable_mask();
            for index in set.element_set_in(group.index(), self.cache)?.enabled_mask().iter_set() {
                let disabled = slices.extract(index * SLICES_PER_CACHE, SLICES_PER_CACHE)?.value();
                caches.push(Cache { group: group.index(), index, disabled });
            }
        }
        Ok(caches)
    }

    /// Primeiro padrão que cobre todas as fatias desabilitadas
    fn fit(&self, caches: &[Cache], pivot: usize) -> Option<Vec<u32>> {
        let low = caches[pivot].disabled.trailing_zeros() % SLICES_PER_CACHE;
        for base in PATTERNS {
            // rotações a partir da menor fatia desabilitada do pivô
            for shift in 0..SLICES_PER_CACHE {
                let offset = (low + shift) as i64;
                let candidate: Vec<u32> = (0..caches.len())
                    .map(|rank| {
                        let by = offset + rank as i64 - pivot as i64;
                        rotl4(base, by.rem_euclid(SLICES_PER_CACHE as i64) as u32)
                    })
                    .collect();

                let covers = caches
                    .iter()
                    .zip(&candidate)
                    .all(|(cache, pattern)| cache.disabled & !pattern == 0);
                let enabled: u32 =
                    candidate.iter().map(|pattern| SLICES_PER_CACHE - pattern.count_ones()).sum();
                let within = self.max_enabled.is_none_or(|max| enabled <= max);
                if covers && within {
                    return Some(candidate);
                }
            }
        }
        None
    }

    fn apply(&self, chip: &mut Chip, caches: &[Cache], candidate: &[u32]) -> FsResult<()> {
        let width = chip.set(self.set)?.per_group(self.slice)?;
        let mut per_group: BTreeMap<usize, u32> = BTreeMap::new();
        for (cache, pattern) in caches.iter().zip(candidate) {
            let shifted = pattern << (cache.index * SLICES_PER_CACHE);
            *per_group.entry(cache.group).or_default() |= shifted;
        }
        for (group, bits) in per_group {
            let target = chip.element_set_ref(self.set, group, self.slice)?;
            chip.disable_elements(target, &Mask::from_bits(width, bits)?)?;
        }
        Ok(())
    }
}

impl Rule for SlicePatternRule {
    fn name(&self) -> &str {
        "slice-pattern"
    }

    fn triggers(&self, _chip: &Chip) -> FsResult<Vec<Trigger>> {
        Ok(Vec::new())
    }

    fn execute(&self, chip: &mut Chip) -> FsResult<()> {
        loop {
            let caches = self.enabled_caches(chip)?;
            let pivot = match caches.iter().position(Cache::is_partial) {
                Some(pivot) => pivot,
                None if self.required && !caches.is_empty() => 0,
                None if self.required => {
                    return Err(FsError::infeasible(format!(
                        "no enabled {} to fit a slice pattern",
                        self.cache
                    )));
                }
                None => return Ok(()),
            };

            if let Some(candidate) = self.fit(&caches, pivot) {
                debug!(
                    cache = %self.cache,
                    caches = caches.len(),
                    ?candidate,
                    "slice pattern accepted"
                );
                return self.apply(chip, &caches, &candidate);
            }
            let (group, index) = chip.disable_one_element(self.set, self.cache)?;
            debug!(cache = %self.cache, group, index, "no slice pattern fits, cache disabled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chip() -> Chip {
        let mut chip = Chip::new();
        chip.add_set(
            &SetSpec::new(UnitKind::Fbp, 2)
                .primary(UnitKind::Ltc)
                .element(ElementSpec::new(UnitKind::Ltc, 2))
                .element(ElementSpec::new(UnitKind::L2Slice, 8).derivative()),
        )
        .unwrap();
        for group in 0..2 {
            chip.add_rule(SubElementDependency::new(UnitKind::Fbp, group, UnitKind::Ltc, UnitKind::L2Slice))
                .unwrap();
        }
        chip
    }

    fn rule() -> SlicePatternRule {
        SlicePatternRule::new(UnitKind::Fbp, UnitKind::Ltc, UnitKind::L2Slice)
    }

    fn slices(chip: &Chip, group: usize) -> u32 {
        let set = chip.set(UnitKind::Fbp).unwrap();
        set.element_set_in(group, UnitKind::L2Slice).unwrap().total_disable_mask().value()
    }

    #[test]
    fn test_rotl4() {
        assert_eq!(rotl4(0b0001, 3), 0b1000);
        assert_eq!(rotl4(0b0011, 3), 0b1001);
        assert_eq!(rotl4(0b0011, 0), 0b0011);
    }

    #[test]
    fn test_clean_chip_untouched_unless_required() {
        let mut chip = chip();
        chip.run_rule(&rule()).unwrap();
        assert_eq!(slices(&chip, 0), 0);

        chip.run_rule(&rule().required()).unwrap();
        assert_eq!(slices(&chip, 0), 0x21);
        assert_eq!(slices(&chip, 1), 0x84);
    }

    #[test]
    fn test_single_defect_slides_three_slice_pattern() {
        let mut chip = chip();
        chip.disable_element(UnitKind::Fbp, 0, UnitKind::L2Slice, 2).unwrap();
        chip.run_rule(&rule()).unwrap();

        assert_eq!(slices(&chip, 0), 0x84);
        assert_eq!(slices(&chip, 1), 0x21);
        assert_eq!(chip.set(UnitKind::Fbp).unwrap().num_enabled(UnitKind::L2Slice).unwrap(), 12);
    }

    #[test]
    fn test_falls_back_to_two_slice_pattern() {
        let mut chip = chip();
        chip.disable_element(UnitKind::Fbp, 0, UnitKind::L2Slice, 0).unwrap();
        chip.disable_element(UnitKind::Fbp, 0, UnitKind::L2Slice, 6).unwrap();
        chip.run_rule(&rule()).unwrap();

        assert_eq!(slices(&chip, 0), 0x63);
        assert_eq!(slices(&chip, 1), 0x9C);
        assert_eq!(chip.set(UnitKind::Fbp).unwrap().num_enabled(UnitKind::Ltc).unwrap(), 4);
    }

    #[test]
    fn test_disables_cache_when_nothing_fits() {
        let mut chip = chip();
        chip.disable_element(UnitKind::Fbp, 0, UnitKind::L2Slice, 0).unwrap();
        chip.disable_element(UnitKind::Fbp, 0, UnitKind::L2Slice, 6).unwrap();
        chip.disable_element(UnitKind::Fbp, 1, UnitKind::L2Slice, 0).unwrap();
        chip.run_rule(&rule()).unwrap();

        let set = chip.set(UnitKind::Fbp).unwrap();
        assert!(set.element_set_in(0, UnitKind::Ltc).unwrap().is_disabled(0).unwrap());
        assert_eq!(set.num_enabled(UnitKind::Ltc).unwrap(), 3);
        assert_eq!(slices(&chip, 0), 0xCF);
        assert_eq!(slices(&chip, 1), 0x39);
    }

    #[test]
    fn test_max_enabled_selects_smaller_pattern() {
        let mut chip = chip();
        chip.run_rule(&rule().max_enabled(8)).unwrap();
        assert_eq!(slices(&chip, 0), 0x63);
        assert_eq!(slices(&chip, 1), 0x9C);
    }

    #[test]
    fn test_requires_four_slices_per_cache() {
        let mut chip = Chip::new();
        chip.add_set(
            &SetSpec::new(UnitKind::Fbp, 2)
                .element(ElementSpec::new(UnitKind::Ltc, 2))
                .element(ElementSpec::new(UnitKind::L2Slice, 6)),
        )
        .unwrap();
        let err = chip.run_rule(&rule()).unwrap_err();
        assert!(!err.is_infeasible());
    }
}

//! Ordered filter stacks.
//!
//! A [`FilterList`] is applied front to back: the output of filter `i` is the
//! input of filter `i + 1`. Order matters, since most pairs of filters do not
//! commute (contrast then brightness is not brightness then contrast).
//!
//! The list is a value. Every edit (`added`, `replaced`, `removed`, `moved`,
//! `reordered`) returns a new list and leaves the receiver alone, so a caller
//! holding an old list never sees it change underneath them.
//!
//! Presets store a list on disk as `{ filters = [...] }` in TOML or JSON:
//!
//! ```toml
//! [[filters]]
//! kind = "contrast"
//! value = 1.4
//!
//! [[filters]]
//! kind = "bayer-two-dithering"
//! value = [180.0, true]
//! ```

use super::{Filter, FilterError, FilterValue, Transformation};
use crate::imaging::{ImageBackend, IntegerSize, RustBackend};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterListError {
    #[error("Index {index} out of range for {len} filters")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("New order is not a permutation of the current filters")]
    NotAPermutation,
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid preset: {0}")]
    Preset(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterList {
    filters: Vec<Filter>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Preset {
    filters: FilterList,
}

impl FilterList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Filter> {
        self.filters.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Filter> {
        self.filters.iter()
    }

    pub fn as_slice(&self) -> &[Filter] {
        &self.filters
    }

    fn check(&self, index: usize) -> Result<(), FilterListError> {
        if index < self.filters.len() {
            Ok(())
        } else {
            Err(FilterListError::IndexOutOfRange {
                index,
                len: self.filters.len(),
            })
        }
    }

    /// New list with `filter` appended.
    pub fn added(&self, filter: Filter) -> FilterList {
        let mut filters = self.filters.clone();
        filters.push(filter);
        FilterList { filters }
    }

    /// New list with the filter at `index` swapped for `filter`.
    pub fn replaced(&self, index: usize, filter: Filter) -> Result<FilterList, FilterListError> {
        self.check(index)?;
        let mut filters = self.filters.clone();
        filters[index] = filter;
        Ok(FilterList { filters })
    }

    /// New list with the filter at `index` carrying `value`.
    pub fn updated(&self, index: usize, value: FilterValue) -> Result<FilterList, FilterListError> {
        self.check(index)?;
        let filter = self.filters[index].with_value(value)?;
        self.replaced(index, filter)
    }

    pub fn removed(&self, index: usize) -> Result<FilterList, FilterListError> {
        self.check(index)?;
        let mut filters = self.filters.clone();
        filters.remove(index);
        Ok(FilterList { filters })
    }

    /// New list with the filter at `from` moved to position `to`.
    pub fn moved(&self, from: usize, to: usize) -> Result<FilterList, FilterListError> {
        self.check(from)?;
        self.check(to)?;
        let mut filters = self.filters.clone();
        let filter = filters.remove(from);
        filters.insert(to, filter);
        Ok(FilterList { filters })
    }

    /// Accept `order` as the new list if it holds exactly the same filters.
    pub fn reordered(&self, order: Vec<Filter>) -> Result<FilterList, FilterListError> {
        if order.len() != self.filters.len() {
            return Err(FilterListError::NotAPermutation);
        }
        let mut counts: HashMap<&Filter, isize> = HashMap::new();
        for f in &self.filters {
            *counts.entry(f).or_default() += 1;
        }
        for f in &order {
            *counts.entry(f).or_default() -= 1;
        }
        if counts.values().any(|&c| c != 0) {
            return Err(FilterListError::NotAPermutation);
        }
        Ok(FilterList { filters: order })
    }

    /// Run every filter in order through `backend`, stopping at the first
    /// failure. An empty list returns a copy of the input.
    pub fn apply(
        &self,
        backend: &impl ImageBackend,
        input: &DynamicImage,
        size: IntegerSize,
    ) -> Result<DynamicImage, FilterError> {
        let mut current = input.clone();
        for filter in &self.filters {
            current = filter.apply(backend, &current, size)?;
        }
        Ok(current)
    }

    // =========================================================================
    // Presets
    // =========================================================================

    /// Load a preset. `.json` files are JSON; anything else is TOML.
    pub fn load_preset(path: &Path) -> Result<FilterList, FilterListError> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let preset: Preset = if is_json {
            serde_json::from_str(&content).map_err(|e| FilterListError::Preset(e.to_string()))?
        } else {
            toml::from_str(&content).map_err(|e| FilterListError::Preset(e.to_string()))?
        };
        Ok(preset.filters)
    }

    pub fn to_preset_toml(&self) -> Result<String, FilterListError> {
        toml::to_string_pretty(&Preset {
            filters: self.clone(),
        })
        .map_err(|e| FilterListError::Preset(e.to_string()))
    }
}

impl Transformation for FilterList {
    /// Keys of the members, hashed in order.
    fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.filters.len() as u64).to_le_bytes());
        for filter in &self.filters {
            hasher.update(filter.cache_key().as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    fn transform(
        &self,
        input: &DynamicImage,
        size: IntegerSize,
    ) -> Result<DynamicImage, FilterError> {
        self.apply(&RustBackend::new(), input, size)
    }
}

impl From<Vec<Filter>> for FilterList {
    fn from(filters: Vec<Filter>) -> Self {
        Self { filters }
    }
}

impl FromIterator<Filter> for FilterList {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        Self {
            filters: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FilterList {
    type Item = &'a Filter;
    type IntoIter = std::slice::Iter<'a, Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterKind;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::{Adjustment, DitheringType};
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn size() -> IntegerSize {
        IntegerSize::new(8, 8)
    }

    fn abc() -> FilterList {
        FilterList::from(vec![
            Filter::Contrast { value: 1.5 },
            Filter::Brightness { value: 0.1 },
            Filter::Negative,
        ])
    }

    // =========================================================================
    // Persistent edits
    // =========================================================================

    #[test]
    fn edits_leave_original_untouched() {
        let list = abc();
        let added = list.added(Filter::Sepia);
        let removed = list.removed(0).unwrap();
        let replaced = list.replaced(2, Filter::Grayscale).unwrap();

        assert_eq!(list, abc());
        assert_eq!(added.len(), 4);
        assert_eq!(added.get(3), Some(&Filter::Sepia));
        assert_eq!(removed.get(0), Some(&Filter::Brightness { value: 0.1 }));
        assert_eq!(replaced.get(2), Some(&Filter::Grayscale));
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let list = abc();
        assert!(matches!(
            list.removed(3),
            Err(FilterListError::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert!(matches!(
            list.replaced(7, Filter::Sepia),
            Err(FilterListError::IndexOutOfRange { index: 7, len: 3 })
        ));
        assert!(matches!(
            FilterList::new().moved(0, 0),
            Err(FilterListError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn moved_shifts_neighbours() {
        let list = abc().moved(0, 2).unwrap();
        let kinds: Vec<_> = list.iter().map(Filter::kind).collect();
        assert_eq!(
            kinds,
            vec![FilterKind::Brightness, FilterKind::Negative, FilterKind::Contrast]
        );
    }

    #[test]
    fn updated_rejects_wrong_shape() {
        let list = abc();
        let err = list.updated(2, FilterValue::Float(1.0)).unwrap_err();
        assert!(matches!(
            err,
            FilterListError::Filter(FilterError::ValueMismatch { .. })
        ));

        let ok = list.updated(0, FilterValue::Float(2.0)).unwrap();
        assert_eq!(ok.get(0), Some(&Filter::Contrast { value: 2.0 }));
    }

    #[test]
    fn reordered_accepts_permutations_only() {
        let list = abc();
        let mut order = list.as_slice().to_vec();
        order.reverse();
        let reversed = list.reordered(order).unwrap();
        assert_eq!(reversed.get(0), Some(&Filter::Negative));

        // Same length, different member
        let swapped = vec![
            Filter::Contrast { value: 1.5 },
            Filter::Brightness { value: 0.1 },
            Filter::Sepia,
        ];
        assert!(matches!(
            list.reordered(swapped),
            Err(FilterListError::NotAPermutation)
        ));

        // Duplicates do not stand in for a missing filter
        let duplicated = vec![Filter::Negative, Filter::Negative, Filter::Contrast { value: 1.5 }];
        assert!(list.reordered(duplicated).is_err());
        assert!(list.reordered(Vec::new()).is_err());
    }

    // =========================================================================
    // Application
    // =========================================================================

    #[test]
    fn apply_runs_in_order() {
        let backend = MockBackend::new();
        let list = FilterList::from(vec![
            Filter::Gamma { value: 2.2 },
            Filter::AtkinsonDithering {
                value: (100.0, false),
            },
        ]);
        list.apply(&backend, &DynamicImage::new_rgb8(2, 2), size())
            .unwrap();

        assert_eq!(
            backend.get_operations(),
            vec![
                RecordedOp::Adjust(Adjustment::Gamma(2.2)),
                RecordedOp::Dither {
                    kind: DitheringType::Atkinson,
                    threshold: 100,
                    grayscale: false,
                },
            ]
        );
    }

    #[test]
    fn apply_stops_at_first_failure() {
        let backend = MockBackend::failing("bad");
        let err = abc()
            .apply(&backend, &DynamicImage::new_rgb8(2, 2), size())
            .unwrap_err();
        assert!(matches!(
            err,
            FilterError::Backend {
                kind: FilterKind::Contrast,
                ..
            }
        ));
        assert_eq!(backend.get_operations().len(), 1);
    }

    #[test]
    fn empty_list_returns_copy() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([1, 2, 3])));
        let out = FilterList::new().transform(&img, size()).unwrap();
        assert_eq!(out.as_bytes(), img.as_bytes());
    }

    #[test]
    fn order_changes_pixels() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(4, 4, |x, y| {
            Rgb([(x * 50) as u8, (y * 50) as u8, 90])
        }));
        let contrast = Filter::Contrast { value: 2.0 };
        let brightness = Filter::Brightness { value: 0.2 };

        let ab = FilterList::from(vec![contrast, brightness]);
        let ba = FilterList::from(vec![brightness, contrast]);

        let out_ab = ab.transform(&img, size()).unwrap();
        let out_ba = ba.transform(&img, size()).unwrap();
        assert_ne!(out_ab.as_bytes(), out_ba.as_bytes());
    }

    // =========================================================================
    // Keys
    // =========================================================================

    #[test]
    fn key_depends_on_order() {
        let list = abc();
        let moved = list.moved(0, 1).unwrap();
        assert_ne!(list.cache_key(), moved.cache_key());
        assert_eq!(list.cache_key(), abc().cache_key());
    }

    #[test]
    fn empty_key_differs_from_identity_filter() {
        let empty = FilterList::new();
        let one = FilterList::from(vec![Filter::Brightness { value: 0.0 }]);
        assert_ne!(empty.cache_key(), one.cache_key());
    }

    // =========================================================================
    // Presets
    // =========================================================================

    #[test]
    fn toml_preset_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("look.toml");
        let list = abc().added(Filter::BayerTwoDithering {
            value: (180.0, true),
        });
        std::fs::write(&path, list.to_preset_toml().unwrap()).unwrap();

        assert_eq!(FilterList::load_preset(&path).unwrap(), list);
    }

    #[test]
    fn json_preset_loads() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("look.json");
        std::fs::write(
            &path,
            r#"{"filters":[{"kind":"sepia"},{"kind":"pixelation","value":4.0}]}"#,
        )
        .unwrap();

        let list = FilterList::load_preset(&path).unwrap();
        assert_eq!(
            list.as_slice(),
            &[Filter::Sepia, Filter::Pixelation { value: 4.0 }]
        );
    }

    #[test]
    fn preset_rejects_unknown_kind() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        std::fs::write(&path, "[[filters]]\nkind = \"blur\"\n").unwrap();
        assert!(matches!(
            FilterList::load_preset(&path),
            Err(FilterListError::Preset(_))
        ));
    }
}

use fnv::{FnvHashMap, FnvHashSet};
use thiserror::Error;

use crate::pipeline::reflection::{ActiveInfo, ValueType};
use crate::runtime::backend::UniformLocation;

/// Returned when a uniform name does not resolve to an active uniform of the target program.
///
/// Uniforms the shader compiler optimized away are not active, so this may also be returned for
/// names that do appear in the shader source.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
#[error("program has no active uniform named `{name}`")]
pub struct UnknownUniform {
    pub(crate) name: String,
}

impl UnknownUniform {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub(crate) struct UniformSlot {
    pub(crate) location: UniformLocation,
    pub(crate) value_type: ValueType,
    pub(crate) size: u32,
    // The location of element 0 for array elements, otherwise `location`.
    array_location: UniformLocation,
    set_since_activation: bool,
}

/// Resolves uniform names for one linked program.
///
/// Slots are enumerated once, from the program's active uniforms, when the program is linked.
/// Lookups after that never query the host.
#[derive(Debug)]
pub(crate) struct UniformRegistry {
    slots: FnvHashMap<String, UniformSlot>,
    reported_unknown: FnvHashSet<String>,
}

impl UniformRegistry {
    /// Builds the registry from every active uniform and its resolved locations.
    ///
    /// For an array uniform the locations are those of `name[0]`, `name[1]`, ... in order.
    pub(crate) fn new<I>(uniforms: I) -> Self
    where
        I: IntoIterator<Item = (ActiveInfo, Vec<UniformLocation>)>,
    {
        let mut slots = FnvHashMap::default();

        for (info, locations) in uniforms {
            let array_location = match locations.first() {
                Some(location) => *location,
                None => continue,
            };

            let base = match info.name.strip_suffix("[0]") {
                Some(base) => base.to_string(),
                None => {
                    slots.insert(
                        info.name,
                        UniformSlot {
                            location: array_location,
                            value_type: info.value_type,
                            size: info.size,
                            array_location,
                            set_since_activation: false,
                        },
                    );

                    continue;
                }
            };

            for (index, location) in locations.into_iter().enumerate() {
                let slot = UniformSlot {
                    location,
                    value_type: info.value_type,
                    size: info.size,
                    array_location,
                    set_since_activation: false,
                };

                // The bare name resolves to element 0.
                if index == 0 {
                    slots.insert(base.clone(), slot);
                }

                slots.insert(format!("{}[{}]", base, index), slot);
            }
        }

        UniformRegistry {
            slots,
            reported_unknown: FnvHashSet::default(),
        }
    }

    pub(crate) fn slot(&self, name: &str) -> Option<&UniformSlot> {
        self.slots.get(name)
    }

    /// Resolves `name`, logging the first failed lookup for every distinct unknown name.
    pub(crate) fn resolve(&mut self, name: &str) -> Result<UniformSlot, UnknownUniform> {
        if let Some(slot) = self.slots.get(name) {
            return Ok(*slot);
        }

        if self.reported_unknown.insert(name.to_string()) {
            log::warn!(
                "uniform `{}` is not an active uniform of the program; it may have been \
                 optimized away",
                name
            );
        }

        Err(UnknownUniform {
            name: name.to_string(),
        })
    }

    /// Writing any element of an array counts as setting the whole array.
    pub(crate) fn mark_set(&mut self, name: &str) {
        let array_location = match self.slots.get(name) {
            Some(slot) => slot.array_location,
            None => return,
        };

        for slot in self.slots.values_mut() {
            if slot.array_location == array_location {
                slot.set_since_activation = true;
            }
        }
    }

    /// Called when the program becomes the active program.
    pub(crate) fn activated(&mut self) {
        for slot in self.slots.values_mut() {
            slot.set_since_activation = false;
        }
    }

    /// The uniforms that were not set since the program last became active, sorted by name.
    ///
    /// Array aliases are reported once, under their `name[0]` spelling.
    pub(crate) fn unset_uniforms(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .slots
            .iter()
            .filter(|(name, slot)| {
                !slot.set_since_activation
                    && slot.location == slot.array_location
                    && !self.slots.contains_key(&format!("{}[0]", name))
            })
            .map(|(name, _)| name.clone())
            .collect();

        names.sort();

        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> UniformRegistry {
        UniformRegistry::new(vec![
            (
                ActiveInfo {
                    name: "rotation".to_string(),
                    value_type: ValueType::FloatMatrix4x4,
                    size: 1,
                },
                vec![UniformLocation::from_raw(1)],
            ),
            (
                ActiveInfo {
                    name: "weights[0]".to_string(),
                    value_type: ValueType::Float,
                    size: 4,
                },
                vec![
                    UniformLocation::from_raw(2),
                    UniformLocation::from_raw(3),
                    UniformLocation::from_raw(4),
                    UniformLocation::from_raw(5),
                ],
            ),
        ])
    }

    #[test]
    fn test_array_uniform_resolves_by_base_name() {
        let mut registry = registry();

        assert_eq!(
            registry.resolve("weights").unwrap().location,
            UniformLocation::from_raw(2)
        );
        assert_eq!(
            registry.resolve("weights[0]").unwrap().location,
            UniformLocation::from_raw(2)
        );
    }

    #[test]
    fn test_array_elements_resolve_to_their_own_locations() {
        let mut registry = registry();

        assert_eq!(
            registry.resolve("weights[1]").unwrap().location,
            UniformLocation::from_raw(3)
        );
        assert_eq!(
            registry.resolve("weights[3]").unwrap().location,
            UniformLocation::from_raw(5)
        );
        assert!(registry.resolve("weights[4]").is_err());
    }

    #[test]
    fn test_setting_an_element_marks_the_array_set() {
        let mut registry = registry();

        registry.mark_set("weights[2]");

        assert_eq!(registry.unset_uniforms(), vec!["rotation".to_string()]);
    }

    #[test]
    fn test_unknown_name_fails_on_every_lookup() {
        let mut registry = registry();

        assert!(registry.resolve("missing").is_err());
        assert!(registry.resolve("missing").is_err());
        assert_eq!(registry.reported_unknown.len(), 1);
    }

    #[test]
    fn test_activation_resets_set_tracking() {
        let mut registry = registry();

        assert_eq!(
            registry.unset_uniforms(),
            vec!["rotation".to_string(), "weights[0]".to_string()]
        );

        registry.mark_set("rotation");
        registry.mark_set("weights");

        assert!(registry.unset_uniforms().is_empty());

        registry.activated();

        assert_eq!(registry.unset_uniforms().len(), 2);
    }
}

use super::gains::BAND_COUNT;
use serde::{Deserialize, Serialize};

/// Name every reset falls back to
pub const FLAT_PRESET: &str = "Flat";
/// Active-preset label once the gains were edited by hand
pub const CUSTOM_LABEL: &str = "Custom";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqPreset {
    pub name: String,
    pub gains: Vec<f32>,
}

impl EqPreset {
    pub fn new(name: &str, gains: &[f32]) -> Self {
        Self {
            name: name.to_string(),
            gains: gains.to_vec(),
        }
    }
}

/// Built-in presets. These can never be overwritten.
pub fn get_default_presets() -> Vec<EqPreset> {
    vec![
        EqPreset::new(FLAT_PRESET, &[0.0; BAND_COUNT]),
        EqPreset::new(
            "Bass Boost",
            &[10., 8., 6., 4., 2., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0.],
        ),
        EqPreset::new(
            "Treble Boost",
            &[0., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0., 2., 4., 6., 8., 10., 10., 10.],
        ),
        EqPreset::new(
            "Vocal",
            &[-2., -2., -1., 0., 2., 4., 5., 5., 4., 3., 2., 1., 0., -1., -2., -2., -3., -3.],
        ),
        EqPreset::new(
            "Rock",
            &[5., 4., 3., 2., -1., -2., -1., 1., 3., 4., 5., 5., 4., 3., 2., 1., 0., 0.],
        ),
        EqPreset::new(
            "Pop",
            &[-2., -1., 0., 2., 4., 5., 4., 2., 0., -1., -2., -1., 0., 2., 3., 4., 3., 2.],
        ),
        EqPreset::new(
            "Jazz",
            &[3., 2., 1., 2., -1., -1., 0., 1., 2., 3., 3., 3., 2., 2., 3., 3., 4., 4.],
        ),
        EqPreset::new(
            "Classical",
            &[4., 3., 2., 1., -1., -1., 0., 0., 1., 2., 2., 3., 3., 2., 1., 2., 3., 4.],
        ),
        EqPreset::new(
            "Electronic",
            &[6., 5., 4., 2., 0., -2., -1., 0., 1., 2., 0., -1., 0., 2., 4., 5., 6., 5.],
        ),
        EqPreset::new(
            "Loudness",
            &[6., 5., 3., 0., -2., -3., -2., 0., 0., 1., 2., 4., 5., 3., 0., -1., 2., 5.],
        ),
    ]
}

/// Built-ins followed by the user's own presets.
#[derive(Debug, Clone)]
pub struct PresetBook {
    builtin: Vec<EqPreset>,
    custom: Vec<EqPreset>,
}

impl Default for PresetBook {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl PresetBook {
    /// Custom presets that shadow a built-in name are dropped on load.
    pub fn new(custom: Vec<EqPreset>) -> Self {
        let builtin = get_default_presets();
        let custom = custom
            .into_iter()
            .filter(|p| !builtin.iter().any(|b| b.name == p.name))
            .collect();
        Self { builtin, custom }
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtin.iter().any(|p| p.name == name)
    }

    pub fn find(&self, name: &str) -> Option<&EqPreset> {
        self.all().find(|p| p.name == name)
    }

    pub fn all(&self) -> impl Iterator<Item = &EqPreset> {
        self.builtin.iter().chain(self.custom.iter())
    }

    pub fn names(&self) -> Vec<String> {
        self.all().map(|p| p.name.clone()).collect()
    }

    pub fn custom(&self) -> &[EqPreset] {
        &self.custom
    }

    /// Store a custom preset and return the name it ended up under.
    ///
    /// Built-in names get a ` (Custom)` suffix; an existing custom preset
    /// with the same name is replaced.
    pub fn save_custom(&mut self, name: &str, gains: &[f32]) -> String {
        let name = if self.is_builtin(name) {
            format!("{} (Custom)", name)
        } else {
            name.to_string()
        };
        self.custom.retain(|p| p.name != name);
        self.custom.push(EqPreset::new(&name, gains));
        name
    }
}

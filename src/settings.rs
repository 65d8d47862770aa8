use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Runtime options read from `settings.json`. Every field has a default, so
/// a partial file is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub present_mode: PresentModeSetting,
    #[serde(default = "RenderSettings::default_shadow_map_size")]
    pub shadow_map_size: u32,
    #[serde(default = "RenderSettings::default_shadows_enabled")]
    pub shadows_enabled: bool,
    #[serde(default = "RenderSettings::default_camera_speed")]
    pub camera_speed: f32,
    #[serde(default = "RenderSettings::default_light_rotation_speed")]
    pub light_rotation_speed: f32,
    /// Degrees of camera rotation per pixel of mouse drag.
    #[serde(default = "RenderSettings::default_mouse_sensitivity")]
    pub mouse_sensitivity: f32,
    #[serde(default)]
    pub assets: AssetSettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            present_mode: PresentModeSetting::default(),
            shadow_map_size: Self::default_shadow_map_size(),
            shadows_enabled: Self::default_shadows_enabled(),
            camera_speed: Self::default_camera_speed(),
            light_rotation_speed: Self::default_light_rotation_speed(),
            mouse_sensitivity: Self::default_mouse_sensitivity(),
            assets: AssetSettings::default(),
        }
    }
}

impl RenderSettings {
    pub fn load() -> Self {
        Self::load_from_path("settings.json")
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|err| {
                warn!(
                    "Failed to parse {:?} ({}). Falling back to default render settings.",
                    path, err
                );
                RenderSettings::default()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Render settings file {:?} not found. Using default settings.",
                    path
                );
                RenderSettings::default()
            }
            Err(err) => {
                warn!(
                    "Failed to read {:?} ({}). Falling back to default render settings.",
                    path, err
                );
                RenderSettings::default()
            }
        }
    }

    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        let settings = serde_json::from_str::<RenderSettings>(contents)?;
        info!("Loaded render settings");
        Ok(settings.validate())
    }

    fn validate(mut self) -> Self {
        if self.shadow_map_size == 0 || !self.shadow_map_size.is_power_of_two() {
            warn!(
                "Shadow map size {} is not a positive power of two. Using default value.",
                self.shadow_map_size
            );
            self.shadow_map_size = Self::default_shadow_map_size();
        }

        if self.resolution.width == 0 || self.resolution.height == 0 {
            warn!("Resolution must be greater than zero. Using default resolution.");
            self.resolution = Resolution::default();
        }

        if !(self.camera_speed.is_finite() && self.camera_speed > 0.0) {
            warn!("Camera speed must be positive. Using default value.");
            self.camera_speed = Self::default_camera_speed();
        }

        if !self.light_rotation_speed.is_finite() {
            warn!("Light rotation speed must be finite. Using default value.");
            self.light_rotation_speed = Self::default_light_rotation_speed();
        }

        if !(self.mouse_sensitivity.is_finite() && self.mouse_sensitivity > 0.0) {
            warn!("Mouse sensitivity must be positive. Using default value.");
            self.mouse_sensitivity = Self::default_mouse_sensitivity();
        }

        self
    }

    pub fn present_mode(&self, available: &[wgpu::PresentMode]) -> wgpu::PresentMode {
        let desired = self.present_mode.to_wgpu();
        if available.contains(&desired) {
            return desired;
        }

        warn!(
            "Requested present mode {:?} is not supported. Falling back to FIFO.",
            desired
        );

        if available.contains(&wgpu::PresentMode::Fifo) {
            wgpu::PresentMode::Fifo
        } else {
            available
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo)
        }
    }

    const fn default_shadow_map_size() -> u32 {
        2048
    }

    const fn default_shadows_enabled() -> bool {
        true
    }

    const fn default_camera_speed() -> f32 {
        10.0
    }

    const fn default_light_rotation_speed() -> f32 {
        0.1
    }

    const fn default_mouse_sensitivity() -> f32 {
        0.25
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Where the demo scene finds its files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    pub texture_dir: PathBuf,
    pub skull_mesh: PathBuf,
    pub skinned_model: PathBuf,
    pub clip_name: String,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            texture_dir: PathBuf::from("assets/textures"),
            skull_mesh: PathBuf::from("assets/models/skull.txt"),
            skinned_model: PathBuf::from("assets/models/soldier.gltf"),
            clip_name: "Take1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentModeSetting {
    #[default]
    Fifo,
    FifoRelaxed,
    Immediate,
    Mailbox,
    AutoVsync,
    AutoNoVsync,
}

impl PresentModeSetting {
    fn to_wgpu(&self) -> wgpu::PresentMode {
        match self {
            PresentModeSetting::Fifo => wgpu::PresentMode::Fifo,
            PresentModeSetting::FifoRelaxed => wgpu::PresentMode::FifoRelaxed,
            PresentModeSetting::Immediate => wgpu::PresentMode::Immediate,
            PresentModeSetting::Mailbox => wgpu::PresentMode::Mailbox,
            PresentModeSetting::AutoVsync => wgpu::PresentMode::AutoVsync,
            PresentModeSetting::AutoNoVsync => wgpu::PresentMode::AutoNoVsync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_replaces_invalid_values_with_defaults() {
        let validated = RenderSettings {
            shadow_map_size: 1000,
            resolution: Resolution {
                width: 0,
                height: 0,
            },
            camera_speed: -1.0,
            mouse_sensitivity: f32::NAN,
            ..RenderSettings::default()
        }
        .validate();

        let defaults = RenderSettings::default();
        assert_eq!(validated.shadow_map_size, defaults.shadow_map_size);
        assert_eq!(validated.resolution.width, defaults.resolution.width);
        assert_eq!(validated.camera_speed, defaults.camera_speed);
        assert_eq!(validated.mouse_sensitivity, defaults.mouse_sensitivity);
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let settings = RenderSettings::from_json(
            r#"{ "shadow_map_size": 1024, "assets": { "clip_name": "Walk" } }"#,
        )
        .unwrap();

        assert_eq!(settings.shadow_map_size, 1024);
        assert!(settings.shadows_enabled);
        assert_eq!(settings.light_rotation_speed, 0.1);
        assert_eq!(settings.assets.clip_name, "Walk");
        assert_eq!(
            settings.assets.texture_dir,
            AssetSettings::default().texture_dir
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(RenderSettings::from_json("{ shadow_map_size: }").is_err());
    }

    #[test]
    fn present_mode_falls_back_to_fifo_when_desired_missing() {
        let settings = RenderSettings {
            present_mode: PresentModeSetting::Mailbox,
            ..RenderSettings::default()
        };

        let available = [wgpu::PresentMode::Fifo, wgpu::PresentMode::Immediate];

        assert_eq!(settings.present_mode(&available), wgpu::PresentMode::Fifo);
    }

    #[test]
    fn present_mode_uses_first_available_when_fifo_missing() {
        let settings = RenderSettings {
            present_mode: PresentModeSetting::Mailbox,
            ..RenderSettings::default()
        };

        assert_eq!(
            settings.present_mode(&[wgpu::PresentMode::Immediate]),
            wgpu::PresentMode::Immediate
        );
    }
}

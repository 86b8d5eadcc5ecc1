//! egui control panel for the shading models, material and light.

use facet_core::furnace::FurnaceReport;
use facet_core::material::{
    ASPECT_RANGE, GLOSSINESS_RANGE, IOR_RANGE, LIGHT_OFFSET_RANGE, METALNESS_RANGE,
};
use facet_core::{
    Brdf, ConfigError, DirectionalLight, MaterialParams, ShadingModel, ShadingModels,
    ViewerConfig,
};
use facet_math::color::{hex_to_srgb_bytes, srgb_bytes_to_hex, srgb_bytes_to_linear};

use crate::shader::ShaderStatus;

/// Everything the GUI edits. The renderer reads it each frame.
#[derive(Debug, Clone)]
pub struct ControlState {
    pub models: ShadingModels,
    pub material: MaterialParams,
    /// Color picker values (sRGB bytes); `material` holds the linear copies
    pub color: [u8; 3],
    pub specular_color: [u8; 3],
    pub light: DirectionalLight,
    pub show_ui: bool,
    pub shader_status: ShaderStatus,
    /// Set by the reload button, consumed by the renderer
    pub reload_requested: bool,
    furnace_resolution: u32,
    furnace: Option<(Brdf, FurnaceReport)>,
}

/// Read-only numbers shown in the panel.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub fps: f32,
    pub size: (u32, u32),
    pub triangles: usize,
    pub env_resolution: u32,
    pub env_mip_levels: u32,
}

impl ControlState {
    pub fn from_config(config: &ViewerConfig) -> Result<Self, ConfigError> {
        let mut state = Self {
            models: config.shading_models()?,
            material: config.material_params(),
            color: hex_to_srgb_bytes(config.material.color),
            specular_color: hex_to_srgb_bytes(config.material.specular_color),
            light: config.directional_light(),
            show_ui: true,
            shader_status: ShaderStatus::Active(crate::shader::ShaderOrigin::Embedded),
            reload_requested: false,
            furnace_resolution: config.furnace_resolution.max(4),
            furnace: None,
        };
        state.sync_colors();
        Ok(state)
    }

    /// Copy the picker bytes into the linear material colors.
    pub fn sync_colors(&mut self) {
        self.material.color = srgb_bytes_to_linear(self.color);
        self.material.specular_color = srgb_bytes_to_linear(self.specular_color);
    }

    pub fn brdf(&self) -> Brdf {
        Brdf::new(self.models, self.material)
    }

    /// White furnace albedo of the current selection, recomputed only when
    /// the models or material changed.
    pub fn furnace_report(&mut self) -> &FurnaceReport {
        let brdf = self.brdf();
        if self.furnace.as_ref().is_some_and(|(cached, _)| *cached != brdf) {
            self.furnace = None;
        }
        let resolution = self.furnace_resolution;
        let (_, report) = self.furnace.get_or_insert_with(|| {
            let report = FurnaceReport::compute(&brdf, resolution);
            log::debug!("Furnace max albedo {:.3}", report.max_albedo());
            (brdf, report)
        });
        report
    }
}

/// Material sliders shown in the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialSlider {
    Metalness,
    Glossiness,
    Aspect,
    Ior,
}

/// Sliders that affect the current model selection, in panel order.
/// Aspect only applies to the anisotropic NDFs and IOR only to Schlick (IoR).
pub fn material_sliders(models: &ShadingModels) -> Vec<MaterialSlider> {
    let mut sliders = vec![MaterialSlider::Metalness, MaterialSlider::Glossiness];
    if models.uses_aspect() {
        sliders.push(MaterialSlider::Aspect);
    }
    if models.uses_ior() {
        sliders.push(MaterialSlider::Ior);
    }
    sliders
}

/// Selector for one model family. Returns true when the choice changed.
fn model_combo<M: ShadingModel>(ui: &mut egui::Ui, current: &mut M) -> bool {
    let before = *current;
    egui::ComboBox::from_label(M::LABEL)
        .selected_text(current.name())
        .width(200.0)
        .show_ui(ui, |ui| {
            for model in M::ALL {
                ui.selectable_value(current, *model, model.name());
            }
        });
    *current != before
}

fn color_row(ui: &mut egui::Ui, label: &str, rgb: &mut [u8; 3]) -> bool {
    ui.horizontal(|ui| {
        let changed = ui.color_edit_button_srgb(rgb).changed();
        ui.label(label);
        ui.weak(format!("#{:06X}", srgb_bytes_to_hex(*rgb)));
        changed
    })
    .inner
}

/// Draw the controls panel. Returns true if any shading input changed.
pub fn draw_panel(ctx: &egui::Context, state: &mut ControlState, stats: &FrameStats) -> bool {
    if !state.show_ui {
        return false;
    }

    let mut changed = false;

    egui::SidePanel::right("controls_panel")
        .default_width(300.0)
        .show(ctx, |ui| {
            ui.heading("Controls");
            ui.separator();

            changed |= model_combo(ui, &mut state.models.ndf);
            changed |= model_combo(ui, &mut state.models.gsf);
            changed |= model_combo(ui, &mut state.models.fresnel);

            ui.separator();

            egui::CollapsingHeader::new("Material")
                .default_open(true)
                .show(ui, |ui| {
                    let mut colors_changed = color_row(ui, "Color", &mut state.color);
                    colors_changed |= color_row(ui, "Specular Color", &mut state.specular_color);
                    if colors_changed {
                        state.sync_colors();
                        changed = true;
                    }

                    let material = &mut state.material;
                    for slider in material_sliders(&state.models) {
                        let widget = match slider {
                            MaterialSlider::Metalness => {
                                egui::Slider::new(&mut material.metalness, METALNESS_RANGE).text("Metalness")
                            }
                            MaterialSlider::Glossiness => {
                                egui::Slider::new(&mut material.glossiness, GLOSSINESS_RANGE).text("Glossiness")
                            }
                            MaterialSlider::Aspect => {
                                egui::Slider::new(&mut material.aspect, ASPECT_RANGE).text("Aspect")
                            }
                            MaterialSlider::Ior => egui::Slider::new(&mut material.ior, IOR_RANGE).text("IOR"),
                        };
                        changed |= ui.add(widget).changed();
                    }
                });

            egui::CollapsingHeader::new("Light Position")
                .default_open(true)
                .show(ui, |ui| {
                    let mut x = state.light.position.x;
                    let mut z = state.light.position.z;
                    let moved = ui
                        .add(egui::Slider::new(&mut x, LIGHT_OFFSET_RANGE).text("X"))
                        .changed()
                        | ui.add(egui::Slider::new(&mut z, LIGHT_OFFSET_RANGE).text("Z")).changed();
                    if moved {
                        state.light.set_offset(x, z);
                        changed = true;
                    }
                });

            ui.separator();

            egui::CollapsingHeader::new("Energy (white furnace)").show(ui, |ui| {
                let report = state.furnace_report();
                for (cos, albedo) in &report.samples {
                    ui.label(format!(
                        "{:>4.1}°  {:.3} {:.3} {:.3}",
                        cos.acos().to_degrees(),
                        albedo.x,
                        albedo.y,
                        albedo.z
                    ));
                }
                if report.conserves_energy(0.01) {
                    ui.label("Conserves energy");
                } else {
                    ui.colored_label(egui::Color32::LIGHT_RED, "Reflects more than it receives");
                }
            });

            egui::CollapsingHeader::new("Shader").show(ui, |ui| {
                match &state.shader_status {
                    ShaderStatus::Active(origin) => {
                        ui.label(format!("Source: {}", origin));
                    }
                    ShaderStatus::Rejected { active, error } => {
                        ui.label(format!("Source: {}", active));
                        ui.colored_label(egui::Color32::LIGHT_RED, "Last edit rejected:");
                        ui.monospace(error);
                    }
                }
                if ui.button("Reload (R)").clicked() {
                    state.reload_requested = true;
                }
            });

            egui::CollapsingHeader::new("Stats").show(ui, |ui| {
                ui.label(format!("FPS: {:.1}", stats.fps));
                ui.label(format!("Resolution: {}x{}", stats.size.0, stats.size.1));
                ui.label(format!("Triangles: {}", stats.triangles));
                ui.label(format!(
                    "Environment: {}px, {} mips",
                    stats.env_resolution, stats.env_mip_levels
                ));
            });

            egui::CollapsingHeader::new("Controls").show(ui, |ui| {
                ui.label("🖱️ Left Mouse: Orbit");
                ui.label("🖱️ Right/Middle Mouse: Pan");
                ui.label("🖱️ Scroll Wheel: Dolly (zoom)");
                ui.label("⌨️ F: Reset camera");
                ui.label("⌨️ R: Reload shaders");
                ui.label("⌨️ H: Toggle panel");
                ui.label("⌨️ Esc: Quit");
            });
        });

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_core::{FresnelModel, NdfModel};

    fn run_frame(state: &mut ControlState) -> bool {
        let ctx = egui::Context::default();
        let mut changed = false;
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            changed = draw_panel(ctx, state, &FrameStats::default());
        });
        changed
    }

    #[test]
    fn test_state_from_default_config() {
        let state = ControlState::from_config(&ViewerConfig::default()).unwrap();
        assert_eq!(state.models, ShadingModels::default());
        assert_eq!(state.color, [0xFF, 0xFF, 0xFF]);
        assert_eq!(state.material, MaterialParams::default());
        assert!(state.show_ui);
    }

    #[test]
    fn test_panel_draws_without_input_changes() {
        let mut state = ControlState::from_config(&ViewerConfig::default()).unwrap();
        state.models.ndf = NdfModel::WardAnisotropic;
        state.models.fresnel = FresnelModel::SchlickIor;
        let before = state.material;
        assert!(!run_frame(&mut state));
        assert_eq!(state.material, before);
        assert!(!state.reload_requested);
    }

    /// Every text run the panel paints, collected from a settled frame.
    fn panel_texts(state: &mut ControlState) -> Vec<String> {
        fn collect(shape: &egui::Shape, out: &mut Vec<String>) {
            match shape {
                egui::Shape::Text(text) => out.push(text.galley.text().to_string()),
                egui::Shape::Vec(shapes) => shapes.iter().for_each(|s| collect(s, out)),
                _ => {}
            }
        }

        let ctx = egui::Context::default();
        let mut output = None;
        for _ in 0..2 {
            output = Some(ctx.run(egui::RawInput::default(), |ctx| {
                draw_panel(ctx, state, &FrameStats::default());
            }));
        }

        let mut texts = Vec::new();
        for clipped in output.map(|o| o.shapes).unwrap_or_default() {
            collect(&clipped.shape, &mut texts);
        }
        texts
    }

    #[test]
    fn test_material_sliders_follow_model_selection() {
        let mut models = ShadingModels::default();
        assert_eq!(
            material_sliders(&models),
            vec![MaterialSlider::Metalness, MaterialSlider::Glossiness]
        );

        models.ndf = NdfModel::TrowbridgeReitzAnisotropic;
        models.fresnel = FresnelModel::SchlickIor;
        assert_eq!(
            material_sliders(&models),
            vec![
                MaterialSlider::Metalness,
                MaterialSlider::Glossiness,
                MaterialSlider::Aspect,
                MaterialSlider::Ior
            ]
        );
    }

    #[test]
    fn test_aspect_and_ior_hidden_for_isotropic_schlick() {
        let mut state = ControlState::from_config(&ViewerConfig::default()).unwrap();
        state.models.ndf = NdfModel::Ggx;
        state.models.fresnel = FresnelModel::Schlick;
        let texts = panel_texts(&mut state);
        assert!(texts.iter().any(|t| t == "Glossiness"));
        assert!(!texts.iter().any(|t| t == "Aspect"));
        assert!(!texts.iter().any(|t| t == "IOR"));

        state.models.ndf = NdfModel::WardAnisotropic;
        state.models.fresnel = FresnelModel::SchlickIor;
        let texts = panel_texts(&mut state);
        assert!(texts.iter().any(|t| t == "Aspect"));
        assert!(texts.iter().any(|t| t == "IOR"));
    }

    #[test]
    fn test_hidden_panel_is_skipped() {
        let mut state = ControlState::from_config(&ViewerConfig::default()).unwrap();
        state.show_ui = false;
        assert!(!run_frame(&mut state));
    }

    #[test]
    fn test_sync_colors_linearizes() {
        let mut state = ControlState::from_config(&ViewerConfig::default()).unwrap();
        state.color = [0x80, 0x00, 0xFF];
        state.sync_colors();
        assert!((state.material.color.x - 0.2158).abs() < 1e-3);
        assert_eq!(state.material.color.y, 0.0);
        assert!((state.material.color.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_furnace_report_is_cached_per_brdf() {
        let mut state = ControlState::from_config(&ViewerConfig::default()).unwrap();
        let first = state.furnace_report().clone();
        assert_eq!(state.furnace_report(), &first);

        state.material.metalness = 1.0;
        state.models.ndf = NdfModel::Ggx;
        let second = state.furnace_report().clone();
        assert_ne!(second, first);
    }
}

/// On-screen card naming the last clicked part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoCard {
    pub title: String,
    pub description: String,
    pub status: Option<String>,
}

impl InfoCard {
    pub fn new() -> Self {
        Self {
            title: "Engine".to_string(),
            description: "Click a highlighted part to see its name.".to_string(),
            status: None,
        }
    }

    pub fn show_part(&mut self, name: &str) {
        self.title = name.to_string();
        self.description = name.to_string();
    }

    pub fn draw(&self, ui: &imgui::Ui) {
        ui.window("Part")
            .position([16.0, 16.0], imgui::Condition::FirstUseEver)
            .size([280.0, 140.0], imgui::Condition::FirstUseEver)
            .build(|| {
                ui.text(&self.title);
                ui.separator();
                ui.text_wrapped(&self.description);

                if let Some(status) = &self.status {
                    ui.separator();
                    ui.text_disabled(status);
                }
            });
    }
}

impl Default for InfoCard {
    fn default() -> Self {
        Self::new()
    }
}

pub mod card_pass;
pub mod outline_pass;
pub mod scene_pass;

use adw::prelude::*;
use adw::Application;

fn main() {
    medirec_messages::logging::init();
    let app = Application::builder()
        .application_id("org.medirec.Messages")
        .build();
    app.connect_activate(|app| {
        medirec_messages::app::build_ui(app);
    });
    app.run();
}

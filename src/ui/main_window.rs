use std::rc::Rc;
use std::sync::Arc;

use adw::prelude::*;
use adw::Application;
use log::error;

use crate::api::client::ApiClient;
use crate::app::AppState;
use crate::messaging::{MessagingCore, SyncEvent};
use crate::session::{self, IdentityProvider};
use crate::ui::Core;

pub fn show_main_window(app: &Application, state: AppState) {
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("MedRecord Messages")
        .default_width(960)
        .default_height(640)
        .build();

    let overlay = adw::ToastOverlay::new();

    let split = adw::Flap::builder()
        .reveal_flap(true)
        .locked(true)
        .modal(false)
        .build();

    let sidebar = Rc::new(crate::ui::sidebar::Sidebar::new());
    split.set_flap(Some(&sidebar.widget()));

    let chat = Rc::new(crate::ui::chat_view::ChatView::new());
    chat.set_sendable(false);
    split.set_content(Some(&chat.widget()));

    overlay.set_child(Some(&split));

    let container = gtk4::Box::new(gtk4::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let title = gtk4::Label::new(Some("Messages"));
    header.set_title_widget(Some(&title));

    let logout_btn = gtk4::Button::with_label("Log out");
    header.pack_end(&logout_btn);
    let refresh_btn = gtk4::Button::with_label("Refresh");
    header.pack_start(&refresh_btn);
    container.append(&header);
    container.append(&overlay);
    window.set_content(Some(&container));
    window.present();

    let shared = session::shared(state.session.clone());
    let client = match ApiClient::new(&state.base_url, shared.clone(), state.request_timeout()) {
        Ok(client) => client,
        Err(err) => {
            error!("cannot reach {}: {}", state.base_url, err);
            overlay.add_toast(adw::Toast::new(&format!("Invalid server address: {}", err)));
            return;
        }
    };
    let core: Arc<Core> = Arc::new(MessagingCore::new(Arc::new(client), shared.clone()).with_timeout(state.request_timeout()));
    let me = shared.current_user().map(|u| u.id);

    let rx = crate::utils::forward_events(core.subscribe());

    {
        let core = core.clone();
        let sidebar = sidebar.clone();
        let chat = chat.clone();
        let overlay = overlay.clone();
        rx.attach(None, move |event| {
            match event {
                SyncEvent::Changed => {
                    let snap = core.snapshot();
                    sidebar.set_items(&snap.contacts);
                    chat.set_sendable(snap.selected.is_some());
                    chat.render(&snap.messages, me.as_deref());
                }
                SyncEvent::Notify(note) => overlay.add_toast(adw::Toast::new(&note.message)),
            }
            glib::ControlFlow::Continue
        });
    }

    {
        let core = core.clone();
        sidebar.connect_selected(move |contact_id| {
            if core.select(Some(contact_id.as_str())) {
                let core = core.clone();
                crate::utils::spawn(async move { core.fetch_messages(&contact_id).await });
            }
        });
    }

    {
        let core = core.clone();
        chat.connect_send(move |text| {
            if let Some(pending) = core.begin_send(&text) {
                let core = core.clone();
                crate::utils::spawn(async move { core.complete_send(pending).await });
            }
        });
    }

    {
        let core = core.clone();
        refresh_btn.connect_clicked(move |_| {
            let core = core.clone();
            crate::utils::spawn(async move {
                core.initialize().await;
                if let Some(id) = core.selected_contact() {
                    core.fetch_messages(&id).await;
                }
            });
        });
    }

    {
        let core = core.clone();
        let app = app.clone();
        let window = window.clone();
        let overlay = overlay.clone();
        logout_btn.connect_clicked(move |_| {
            core.cancel_in_flight();
            session::sign_out(&shared);
            let mut settings = state.clone();
            settings.session = session::read(&shared).clone();
            if let Err(e) = settings.save() {
                overlay.add_toast(adw::Toast::new(&format!("Failed to save settings: {}", e)));
            }
            crate::ui::login::show_login_window(&app, settings);
            window.close();
        });
    }

    {
        let core = core.clone();
        crate::utils::spawn(async move { core.initialize().await });
    }
}

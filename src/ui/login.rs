use std::rc::Rc;

use adw::prelude::*;
use adw::Application;
use gtk4 as gtk;
use log::{info, warn};

use crate::api::client::ApiClient;
use crate::app::AppState;
use crate::session::{self, CurrentUser, Session};
use crate::error::TransportError;

pub fn show_login_window(app: &Application, state: AppState) {
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("MedRecord Login")
        .default_width(420)
        .default_height(300)
        .resizable(false)
        .build();

    let toast_overlay = adw::ToastOverlay::new();

    let root = gtk::Box::new(gtk::Orientation::Vertical, 12);
    root.set_margin_top(24);
    root.set_margin_bottom(24);
    root.set_margin_start(24);
    root.set_margin_end(24);

    let title = gtk::Label::new(Some("Sign in to MedRecord"));
    title.add_css_class("title-2");
    title.set_halign(gtk::Align::Start);
    root.append(&title);

    let server_entry = gtk::Entry::new();
    server_entry.set_placeholder_text(Some("Server URL (e.g. https://portal.example.org)"));
    server_entry.set_text(&state.base_url);
    server_entry.set_hexpand(true);

    let email_entry = gtk::Entry::new();
    email_entry.set_placeholder_text(Some("Email"));
    email_entry.set_hexpand(true);

    let pass_entry = gtk::PasswordEntry::new();
    pass_entry.set_placeholder_text(Some("Password"));
    pass_entry.set_hexpand(true);

    let form = gtk::Box::new(gtk::Orientation::Vertical, 8);
    form.append(&server_entry);
    form.append(&email_entry);
    form.append(&pass_entry);
    root.append(&form);

    let status = gtk::Label::new(None);
    status.add_css_class("dim-label");
    status.set_halign(gtk::Align::Start);
    root.append(&status);

    let login_btn = gtk::Button::with_label("Login");
    login_btn.add_css_class("suggested-action");
    login_btn.set_halign(gtk::Align::End);
    root.append(&login_btn);

    toast_overlay.set_child(Some(&root));
    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let header_title = gtk::Label::new(Some("MedRecord"));
    header.set_title_widget(Some(&header_title));
    container.append(&header);
    container.append(&toast_overlay);
    window.set_content(Some(&container));

    let on_connect = {
        let app = app.clone();
        let window = window.clone();
        let overlay = toast_overlay.clone();
        let server_entry = server_entry.clone();
        let email_entry = email_entry.clone();
        let pass_entry = pass_entry.clone();
        let status = status.clone();
        move || {
            let url = crate::utils::normalize_url(&server_entry.text());
            let email = email_entry.text().trim().to_string();
            let password = pass_entry.text().to_string();
            if email.is_empty() || password.is_empty() {
                overlay.add_toast(adw::Toast::new("Please enter your email and password."));
                return;
            }

            status.set_label("Signing in…");
            let mut settings = state.clone();
            settings.base_url = url.clone();
            let shared = session::shared(Session::default());
            let timeout = settings.request_timeout();
            let shared_for_async = shared.clone();
            let rx: glib::Receiver<Result<CurrentUser, TransportError>> = crate::utils::reply_on_main(async move {
                let client = ApiClient::new(&url, shared_for_async.clone(), timeout)?;
                session::sign_in(&client, &shared_for_async, &email, &password).await
            });

            let status_label = status.clone();
            let app2 = app.clone();
            let window2 = window.clone();
            let overlay2 = overlay.clone();
            rx.attach(None, move |res| {
                match res {
                    Ok(user) => {
                        info!("login ok for {}", user.id);
                        settings.session = session::read(&shared).clone();
                        if let Err(e) = settings.save() {
                            overlay2.add_toast(adw::Toast::new(&format!("Failed to save settings: {}", e)));
                        }
                        crate::ui::main_window::show_main_window(&app2, settings.clone());
                        window2.close();
                    }
                    Err(err) => {
                        warn!("login failed: {}", err);
                        status_label.set_label("Login failed");
                        overlay2.add_toast(adw::Toast::new(&format!("Login failed: {}", err)));
                    }
                }
                glib::ControlFlow::Continue
            });
        }
    };

    let on_connect: Rc<dyn Fn()> = Rc::new(on_connect);
    {
        let on_connect = on_connect.clone();
        login_btn.connect_clicked(move |_| (on_connect)());
    }
    {
        let on_connect = on_connect.clone();
        email_entry.connect_activate(move |_| (on_connect)());
    }
    {
        let on_connect = on_connect.clone();
        pass_entry.connect_activate(move |_| (on_connect)());
    }

    window.present();
}

use gtk4::prelude::*;
use gtk4 as gtk;

use crate::api::models::{Message, MessageStatus};

pub struct ChatView {
    root: gtk::Box,
    scroller: gtk::ScrolledWindow,
    messages_box: gtk::Box,
    entry: gtk::Entry,
    send_btn: gtk::Button,
}

impl ChatView {
    pub fn new() -> Self {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);

        let scroller = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .hexpand(true)
            .build();
        let messages_box = gtk::Box::new(gtk::Orientation::Vertical, 6);
        scroller.set_child(Some(&messages_box));
        root.append(&scroller);

        let input_row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        let entry = gtk::Entry::new();
        entry.set_hexpand(true);
        entry.set_placeholder_text(Some("Type a message…"));
        let send_btn = gtk::Button::with_label("Send");
        input_row.append(&entry);
        input_row.append(&send_btn);
        root.append(&input_row);

        Self { root, scroller, messages_box, entry, send_btn }
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    /// Calls `f` with the entry text on Send or Enter, then clears the entry.
    pub fn connect_send<F: Fn(String) + 'static>(&self, f: F) {
        use std::rc::Rc;
        let entry = self.entry.clone();
        let send: Rc<dyn Fn()> = Rc::new(move || {
            let text = entry.text().to_string();
            if text.trim().is_empty() {
                return;
            }
            entry.set_text("");
            f(text);
        });
        {
            let send = send.clone();
            self.send_btn.connect_clicked(move |_| (send)());
        }
        self.entry.connect_activate(move |_| (send)());
    }

    pub fn set_sendable(&self, sendable: bool) {
        self.entry.set_sensitive(sendable);
        self.send_btn.set_sensitive(sendable);
    }

    pub fn render(&self, messages: &[Message], me: Option<&str>) {
        while let Some(child) = self.messages_box.first_child() {
            self.messages_box.remove(&child);
        }
        for msg in messages {
            let text = match msg.status {
                Some(MessageStatus::Sending) => format!("{} (sending…)", msg.content),
                Some(MessageStatus::Failed) => format!("{} (failed)", msg.content),
                None => msg.content.clone(),
            };
            let lbl = gtk::Label::new(Some(&text));
            lbl.set_wrap(true);
            let mine = me.is_some_and(|id| msg.is_from(id));
            lbl.set_halign(if mine { gtk::Align::End } else { gtk::Align::Start });
            if msg.is_failed() {
                lbl.add_css_class("error");
            }
            self.messages_box.append(&lbl);
        }
        let adj = self.scroller.vadjustment();
        adj.set_value(adj.upper());
    }
}

use std::cell::RefCell;
use std::rc::Rc;

use gtk4::prelude::*;
use gtk4 as gtk;

use crate::api::models::Contact;

pub struct Sidebar {
    root: gtk::Box,
    list: gtk::ListBox,
    shown: Rc<RefCell<Vec<Contact>>>,
}

impl Sidebar {
    pub fn new() -> Self {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);

        let title = gtk::Label::new(Some("Contacts"));
        title.add_css_class("heading");
        title.set_halign(gtk::Align::Start);
        root.append(&title);

        let list = gtk::ListBox::new();
        root.append(&list);

        Self { root, list, shown: Rc::new(RefCell::new(Vec::new())) }
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    /// Calls `f` with the contact id of the row the user activates.
    pub fn connect_selected<F: Fn(String) + 'static>(&self, f: F) {
        let shown = self.shown.clone();
        self.list.connect_row_activated(move |_, row| {
            let idx = row.index();
            if idx < 0 {
                return;
            }
            let id = shown.borrow().get(idx as usize).map(|c| c.id.clone());
            if let Some(id) = id {
                f(id);
            }
        });
    }

    pub fn set_items(&self, items: &[Contact]) {
        // Whole contacts: rows also show the unread count and last message.
        if self.shown.borrow().as_slice() == items {
            return;
        }
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
        for contact in items {
            let row = gtk::ListBoxRow::new();
            let label = gtk::Label::new(Some(&row_text(contact)));
            label.set_margin_top(8);
            label.set_margin_bottom(8);
            label.set_margin_start(8);
            label.set_margin_end(8);
            label.set_halign(gtk::Align::Start);
            row.set_child(Some(&label));
            self.list.append(&row);
        }
        *self.shown.borrow_mut() = items.to_vec();
    }
}

fn row_text(contact: &Contact) -> String {
    match (&contact.last_message, contact.unread_count) {
        (Some(last), 0) => format!("{}\n{}", contact.name, last),
        (Some(last), n) => format!("{} ({})\n{}", contact.name, n, last),
        (None, _) => contact.name.clone(),
    }
}

//! Emergency-services directory: category -> organizations to notify.

use crate::model::EmergencyContact;
use std::collections::HashMap;
use tracing::{info, warn};

/// Loadable mapping from report category to an ordered contact list.
/// A missing or unreadable directory file degrades to the built-in
/// defaults; that is an operational warning, never an error.
#[derive(Debug, Clone)]
pub struct Directory {
    entries: HashMap<String, Vec<EmergencyContact>>,
}

impl Directory {
    pub fn load(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => {
                    info!(%path, "Emergency services directory loaded");
                    Self { entries }
                }
                Err(e) => {
                    warn!(%path, error = %e, "Invalid emergency services file, using defaults");
                    Self::fallback()
                }
            },
            Err(_) => {
                warn!(%path, "Emergency services file not found, using defaults");
                Self::fallback()
            }
        }
    }

    /// Built-in default directory.
    pub fn fallback() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            "securite".to_string(),
            vec![
                contact("Police Municipale", "17", "police@ville.fr"),
                contact("Gendarmerie", "17", "gendarmerie@ville.fr"),
            ],
        );
        entries.insert(
            "incendie".to_string(),
            vec![contact("Pompiers", "18", "pompiers@ville.fr")],
        );
        entries.insert(
            "sante".to_string(),
            vec![
                contact("SAMU", "15", "samu@ville.fr"),
                contact("Hôpital Central", "04.XX.XX.XX.XX", "urgences@hopital.fr"),
            ],
        );
        entries.insert(
            "infrastructure".to_string(),
            vec![
                contact("Services Techniques", "04.XX.XX.XX.XX", "technique@ville.fr"),
                contact("Voirie", "04.XX.XX.XX.XX", "voirie@ville.fr"),
            ],
        );
        entries.insert(
            "environnement".to_string(),
            vec![contact(
                "Service Environnement",
                "04.XX.XX.XX.XX",
                "environnement@ville.fr",
            )],
        );
        Self { entries }
    }

    /// Union of the contact lists for the given categories, deduplicated
    /// by organization name, preserving lookup order.
    pub fn contacts_for(&self, categories: &[String]) -> Vec<EmergencyContact> {
        let mut contacts: Vec<EmergencyContact> = Vec::new();
        for category in categories {
            if let Some(list) = self.entries.get(category) {
                for entry in list {
                    if !contacts.iter().any(|c| c.name == entry.name) {
                        contacts.push(entry.clone());
                    }
                }
            }
        }
        contacts
    }
}

fn contact(name: &str, phone: &str, email: &str) -> EmergencyContact {
    EmergencyContact {
        name: name.to_string(),
        phone: phone.to_string(),
        email: email.to_string(),
    }
}

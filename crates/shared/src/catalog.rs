//! Fixed wardrobe catalog, in display order with the base preset first.

use crate::domain::{OutfitKind, OutfitPreset};

static CATALOG: [OutfitPreset; 7] = [
    OutfitPreset {
        id: OutfitKind::Base,
        label: "BASE MODEL",
        description: "Factory default synthskin bodysuit",
        prompt_modifier: "wearing a simple form-fitting grey synthskin bodysuit, minimal accessories",
        icon: "🧬",
    },
    OutfitPreset {
        id: OutfitKind::School,
        label: "ACADEMY UNIFORM",
        description: "Neo-Tokyo High School Uniform",
        prompt_modifier: "wearing japanese school uniform, plaid skirt, high tech headphones",
        icon: "🎒",
    },
    OutfitPreset {
        id: OutfitKind::Office,
        label: "CORPO SUIT",
        description: "Arasaka Style Executive Wear",
        prompt_modifier: "wearing formal black business suit, pencil skirt, tactical glasses",
        icon: "💼",
    },
    OutfitPreset {
        id: OutfitKind::Space,
        label: "EVA ARMOR",
        description: "Orbital Station EVA Suit",
        prompt_modifier: "wearing white glossy sci-fi space armor, tight fit, glowing lights",
        icon: "🚀",
    },
    OutfitPreset {
        id: OutfitKind::Street,
        label: "NIGHT CITY STREET",
        description: "Casual Streetwear",
        prompt_modifier: "wearing oversized bomber jacket, crop top, cargo pants, sneakers",
        icon: "🛹",
    },
    OutfitPreset {
        id: OutfitKind::Netrunner,
        label: "NETRUNNER SUIT",
        description: "Deep Dive Interface Suit",
        prompt_modifier: "wearing tight latex bodysuit, glowing circuit lines, data cables connected",
        icon: "🕶️",
    },
    OutfitPreset {
        id: OutfitKind::Evening,
        label: "NEON GALA",
        description: "Holographic Evening Gown",
        prompt_modifier: "wearing an elegant holographic evening gown, iridescent fabric, chrome jewelry",
        icon: "🍸",
    },
];

pub fn catalog() -> &'static [OutfitPreset] {
    &CATALOG
}

pub fn base_preset() -> &'static OutfitPreset {
    preset(OutfitKind::Base)
}

pub fn preset(kind: OutfitKind) -> &'static OutfitPreset {
    // Catalog order mirrors the `OutfitKind` declaration order.
    &CATALOG[kind as usize]
}

/// Looks a preset up by id (`school`) or by label (`corpo suit`).
pub fn find_preset(query: &str) -> Option<&'static OutfitPreset> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    CATALOG.iter().find(|preset| {
        preset.id.as_str().eq_ignore_ascii_case(query) || preset.label.eq_ignore_ascii_case(query)
    })
}

use invsync_core::{ItemId, ItemStack, RecipeId, SlotTag};
use invsync_inventory::{InventoryConfig, SlotRef};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

pub const DEFAULT_SESSION_PATH: &str = "config/session.toml";
const DEFAULT_ITEMS_PATH: &str = "config/items.json";
const DEFAULT_RECIPES_PATH: &str = "config/recipes.json";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Item pack (JSON array of item definitions).
    pub items: PathBuf,
    /// Recipe pack (JSON array of recipes).
    pub recipes: PathBuf,
    /// Generic slots shown by the client view.
    pub slot_count: usize,
    pub prefer_empty_universal_slots: bool,
    /// Actions between deliveries; 1 delivers after every action.
    pub pump_every: usize,
    pub inventory: InventoryConfig,
    /// Items the server holds before the client connects.
    pub grants: Vec<ItemStack>,
    pub actions: Vec<SessionAction>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            items: PathBuf::from(DEFAULT_ITEMS_PATH),
            recipes: PathBuf::from(DEFAULT_RECIPES_PATH),
            slot_count: 12,
            prefer_empty_universal_slots: false,
            pump_every: 1,
            inventory: InventoryConfig::default(),
            grants: Vec::new(),
            actions: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents).unwrap_or_else(|err| {
                warn!("Failed to parse {}: {err}. Using defaults", path.display());
                SessionConfig::default()
            }),
            Err(err) => {
                if err.kind() == std::io::ErrorKind::NotFound {
                    warn!("Session config not found at {}. Using defaults", path.display());
                } else {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                }
                SessionConfig::default()
            }
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

/// A slot named in a script: a grid index or a tagged slot name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SlotAddress {
    Grid(usize),
    Tagged(SlotTag),
}

impl SlotAddress {
    pub fn to_slot_ref(&self) -> SlotRef {
        match self {
            SlotAddress::Grid(index) => SlotRef::Generic(*index),
            SlotAddress::Tagged(tag) => SlotRef::Tagged(tag.clone()),
        }
    }
}

/// One scripted step. Client actions are predicted and forwarded; `grant`
/// changes the server directly.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SessionAction {
    Move {
        from: SlotAddress,
        to: SlotAddress,
        /// Whole stack when unset.
        #[serde(default)]
        quantity: Option<i32>,
    },
    MoveToTagged {
        from: SlotAddress,
    },
    Drop {
        slot: SlotAddress,
        quantity: i32,
        #[serde(default)]
        angle: f32,
    },
    Use {
        slot: SlotAddress,
    },
    Craft {
        recipe: RecipeId,
    },
    SetRecipeLock {
        recipe: RecipeId,
        locked: bool,
    },
    DropAll,
    Grant {
        item: ItemId,
        quantity: i32,
    },
}

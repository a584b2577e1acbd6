//! Built-in category list, the last tier of the config fallback chain

use crate::config::types::Category;

/// Host that older configs still point at
pub const STALE_HOST: &str = "EcoHub.org";

/// Host that replaces [`STALE_HOST`]
pub const CANONICAL_HOST: &str = "rutracker.org";

const FORUM_ROOT: &str = "https://rutracker.org/forum/viewforum.php?f=";

/// (id, name, forum id, title filter, priority)
const BUILT_IN: &[(&str, &str, u32, &str, u32)] = &[
    ("switch", "Nintendo Switch", 1605, "[Nintendo Switch]", 1),
    ("psx", "Playstation 1", 908, "[PS]", 2),
    ("ps2", "Playstation 2", 357, "[PS2]", 3),
    ("psp", "Playstation Portable", 1352, "[PSP]", 4),
    ("ps3", "Playstation 3", 886, "[PS3]", 5),
    ("ps4", "Playstation 4", 973, "[PS4]", 6),
    ("ps5", "Playstation 5", 546, "[PS5]", 7),
    ("psvita", "Playstation Vita", 595, "[PS Vita]", 8),
    ("xbox360", "Xbox 360", 510, "[XBOX360]", 9),
    ("wii", "Nintendo Wii", 773, "[Nintendo Wii]", 10),
    ("gamecube", "Nintendo GameCube", 773, "[GameCube]", 11),
    ("wiiu", "Nintendo Wii U", 773, "[Nintendo Wii U]", 12),
    ("ds", "Nintendo DS", 774, "[NDS]", 13),
    ("3ds", "Nintendo 3DS", 774, "[3DS]", 14),
    ("dreamcast", "Sega Dreamcast", 968, "[Dreamcast]", 15),
    ("windows-fight", "Windows Fight Games", 2203, "[DL]", 15),
    ("windows-first-person", "Windows First Person Games", 647, "[DL]", 15),
    ("windows-third-person", "Windows Third Person Games", 646, "[DL]", 15),
    ("windows-horror", "Windows Horror Games", 50, "[DL]", 15),
    ("windows-rpg", "Windows RPG Games", 52, "[DL]", 15),
    ("windows-rts", "Windows RTS Games", 51, "[DL]", 15),
    ("windows-arcade", "Windows Arcade Games", 127, "[DL]", 15),
];

/// The hard-coded category list
pub fn built_in_categories() -> Vec<Category> {
    BUILT_IN
        .iter()
        .map(|&(id, name, forum, title_search, priority)| Category {
            id: id.to_string(),
            name: name.to_string(),
            base_url: format!("{}{}", FORUM_ROOT, forum),
            title_search: title_search.to_string(),
            enabled: true,
            priority,
        })
        .collect()
}

/// Replaces the stale host in a URL; returns `None` when nothing changed
pub fn fix_stale_host(url: &str) -> Option<String> {
    url.contains(STALE_HOST)
        .then(|| url.replace(STALE_HOST, CANONICAL_HOST))
}

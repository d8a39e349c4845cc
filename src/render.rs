//! ASCII rendering of the notes forest and of a single document.

use crate::models::Item;
use crate::selection::Selection;
use crate::store::Forest;

const FOLDER_OPEN: char = '▾';
const FOLDER_CLOSED: char = '▸';
const DOCUMENT: char = '•';
const SELECTED_MARK: &str = " ◂";

/// Render the forest as a tree browser.
///
/// With a `selection`, only expanded folders show their children and the
/// selected item is marked. Without one, every folder is shown expanded.
///
/// Example output:
/// ```text
/// ▾ Notes
/// ├── • todo ◂
/// └── ▸ Archive
/// • Inbox
/// ```
pub fn render_tree(forest: &Forest, selection: Option<&Selection>) -> String {
    let mut output = String::new();
    for item in forest.roots() {
        render_node(&mut output, item, selection, "", None);
    }
    output
}

fn marker(item: &Item, selection: Option<&Selection>) -> char {
    if !item.is_folder() {
        return DOCUMENT;
    }
    if is_open(item, selection) {
        FOLDER_OPEN
    } else {
        FOLDER_CLOSED
    }
}

fn is_open(item: &Item, selection: Option<&Selection>) -> bool {
    selection.map_or(true, |s| s.is_expanded(item.id))
}

/// `is_last` is `None` for root items, which get no branch characters.
fn render_node(
    output: &mut String,
    item: &Item,
    selection: Option<&Selection>,
    prefix: &str,
    is_last: Option<bool>,
) {
    if let Some(is_last) = is_last {
        output.push_str(prefix);
        output.push_str(if is_last { "└── " } else { "├── " });
    }
    output.push(marker(item, selection));
    output.push(' ');
    output.push_str(&item.name);
    if selection.is_some_and(|s| s.is_selected(item.id)) {
        output.push_str(SELECTED_MARK);
    }
    output.push('\n');

    if !item.is_folder() || !is_open(item, selection) {
        return;
    }

    let child_prefix = match is_last {
        None => String::new(),
        Some(true) => format!("{}    ", prefix),
        Some(false) => format!("{}│   ", prefix),
    };

    let children = item.children();
    for (i, child) in children.iter().enumerate() {
        let child_is_last = i == children.len() - 1;
        render_node(output, child, selection, &child_prefix, Some(child_is_last));
    }
}

/// Render a document for the preview pane: its name, a rule, then its text.
/// Folders render as their name only.
pub fn render_document(item: &Item) -> String {
    let mut output = String::new();
    output.push_str(&item.name);
    output.push('\n');
    if let Some(content) = item.content() {
        output.push_str(&"─".repeat(item.name.chars().count().max(1)));
        output.push('\n');
        output.push_str(content);
        if !content.is_empty() && !content.ends_with('\n') {
            output.push('\n');
        }
    }
    output
}

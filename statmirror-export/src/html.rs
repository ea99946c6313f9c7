//! Templated HTML inventory page.
//!
//! Pages are rendered with `handlebars`. The page template sees
//! `player-name` plus, per section, `show-<section>` (`"show"` or empty) and
//! `<section>-items`, a list of items rendered through the `item` partial.
//! Every value is HTML-escaped on output and inserted text is never
//! re-expanded.

use std::fmt;
use std::path::Path;

use handlebars::Handlebars;
use serde::Serialize;
use serde_json::{Map, Value};

use statmirror_core::classify::{BucketKind, ItemCollectionView};
use statmirror_core::entity::{ItemQuality, ItemSnapshot};
use statmirror_core::stats::Stat;

use crate::describe::ItemDescriber;
use crate::error::{ExportError, Result};

const DEFAULT_TEMPLATE: &str = include_str!("templates/inventory.html");
const ITEM_PARTIAL: &str = include_str!("templates/item.html");

const PAGE: &str = "page";
const PLAYER_NAME: &str = "player-name";

const STAT_COLOR: &str = "#4169E1";
const UNIDENTIFIED_COLOR: &str = "#DD0000";

/// Placeholder stem of each bucket's section.
#[must_use]
pub fn section_key(kind: BucketKind) -> &'static str {
    match kind {
        BucketKind::Equipped => "equipped",
        BucketKind::Inventory => "inventory",
        BucketKind::Mercenary => "merc",
        BucketKind::Cube => "cube",
        BucketKind::PersonalStash => "stash-personal",
        BucketKind::SharedStash1 => "stash-shared1",
        BucketKind::SharedStash2 => "stash-shared2",
        BucketKind::SharedStash3 => "stash-shared3",
    }
}

#[derive(Serialize)]
struct ItemView {
    name: String,
    color: String,
    stats: Vec<StatLine>,
}

#[derive(Serialize)]
struct StatLine {
    text: String,
    color: &'static str,
}

impl StatLine {
    fn new(text: impl Into<String>, color: &'static str) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }
}

/// A compiled HTML page template.
#[derive(Clone)]
pub struct HtmlTemplate {
    registry: Handlebars<'static>,
}

impl fmt::Debug for HtmlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtmlTemplate").finish_non_exhaustive()
    }
}

impl Default for HtmlTemplate {
    fn default() -> Self {
        let mut registry = Handlebars::new();
        // A built-in source that fails to compile surfaces as a render error.
        let _ = registry.register_partial("item", ITEM_PARTIAL);
        let _ = registry.register_template_string(PAGE, DEFAULT_TEMPLATE);
        Self { registry }
    }
}

impl HtmlTemplate {
    /// Compile `source` as the page template. It can use the `item`
    /// partial for each entry of a `<section>-items` list.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Template`] if `{{player-name}}` is missing or
    /// the source does not compile.
    pub fn new(source: impl AsRef<str>) -> Result<Self> {
        let source = source.as_ref();
        if !source.contains("{{player-name}}") {
            return Err(ExportError::Template(
                "template has no {{player-name}} placeholder".into(),
            ));
        }

        let mut registry = Handlebars::new();
        registry
            .register_partial("item", ITEM_PARTIAL)
            .map_err(|e| ExportError::Template(e.to_string()))?;
        registry
            .register_template_string(PAGE, source)
            .map_err(|e| ExportError::Template(e.to_string()))?;
        Ok(Self { registry })
    }

    /// Read a template file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid template.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::new(std::fs::read_to_string(path)?)
    }

    /// Render the page for `player_name`.
    ///
    /// Items in each section are sorted by type.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Template`] if rendering fails.
    pub fn render(
        &self,
        player_name: &str,
        view: &ItemCollectionView,
        describer: &dyn ItemDescriber,
    ) -> Result<String> {
        let sorted = view.sorted_by_type();

        let mut data = Map::new();
        data.insert(PLAYER_NAME.into(), Value::from(player_name));
        for (kind, items) in sorted.iter_buckets() {
            let key = section_key(kind);
            let class = if items.is_empty() { "" } else { "show" };
            let items: Vec<ItemView> = items.iter().map(|item| item_view(item, describer)).collect();
            data.insert(format!("show-{key}"), Value::from(class));
            data.insert(format!("{key}-items"), serde_json::to_value(items)?);
        }

        self.registry
            .render(PAGE, &data)
            .map_err(|e| ExportError::Template(e.to_string()))
    }
}

fn item_view(item: &ItemSnapshot, describer: &dyn ItemDescriber) -> ItemView {
    let above_superior = item.detail().quality > ItemQuality::Superior;
    let mut name = describer.full_name(item);

    let stats = if above_superior && !item.is_identified() {
        let mut lines = vec![StatLine::new("Unidentified", UNIDENTIFIED_COLOR)];
        if let Some(defense) = item.stats().get(Stat::Defense) {
            lines.push(StatLine::new(
                format!("{}: {defense}", Stat::Defense.display_name()),
                STAT_COLOR,
            ));
        }
        lines
    } else {
        if above_superior {
            name = name.replace("[Identified] ", "");
        }
        describer
            .stat_lines(item)
            .into_iter()
            .map(|line| StatLine::new(line, STAT_COLOR))
            .collect()
    };

    ItemView {
        name,
        color: describer.color(item),
        stats,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use statmirror_core::classify::ClassificationContext;
    use statmirror_core::entity::{
        BodyLoc, InvPage, ItemDetail, ItemFlags, ItemMode, Snapshot, UnitHeader,
    };
    use statmirror_core::stats::StatTable;
    use statmirror_core::types::{Position, UnitId, UnitType};

    use super::*;
    use crate::describe::BasicDescriber;

    fn inventory_item(id: u32, txt: u32, quality: ItemQuality, flags: ItemFlags) -> Arc<ItemSnapshot> {
        let stats: StatTable = [(Stat::Defense, 31)].into_iter().collect();
        Arc::new(Snapshot::assemble(
            UnitHeader::detached(UnitType::Item, UnitId(id), txt, 0),
            stats,
            ItemDetail {
                quality,
                owner_id: UnitId(1),
                flags,
                prefixes: [0; 3],
                body_loc: BodyLoc::None,
                inv_page: InvPage::Inventory,
                mode: ItemMode::Stored,
                position: Position::default(),
            },
        ))
    }

    fn view(items: &[Arc<ItemSnapshot>]) -> ItemCollectionView {
        let ctx = ClassificationContext {
            player_id: UnitId(1),
            ..ClassificationContext::default()
        };
        ItemCollectionView::classify(items, &ctx).expect("classify")
    }

    #[test]
    fn sections_show_only_when_filled() {
        let items = [inventory_item(10, 5, ItemQuality::Normal, ItemFlags::IDENTIFIED)];
        let page = HtmlTemplate::default().render("Vexia", &view(&items), &BasicDescriber::new())
            .expect("render");

        assert!(page.contains("<h1>Vexia</h1>"));
        assert!(page.contains("<section class=\"show\"><h2>Inventory</h2>"));
        assert!(page.contains("<section class=\"\"><h2>Horadric Cube</h2>"));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn unidentified_magic_items_hide_stats() {
        let items = [inventory_item(10, 5, ItemQuality::Rare, ItemFlags::empty())];
        let page = HtmlTemplate::default().render("Vexia", &view(&items), &BasicDescriber::new())
            .expect("render");
        assert!(page.contains("color:#DD0000\">Unidentified</div>"));
        assert!(page.contains(">Defense: 31</div>"));
    }

    #[test]
    fn items_sorted_by_type_within_section() {
        let items = [
            inventory_item(1, 90, ItemQuality::Normal, ItemFlags::IDENTIFIED),
            inventory_item(2, 12, ItemQuality::Normal, ItemFlags::IDENTIFIED),
        ];
        let page = HtmlTemplate::default().render("P", &view(&items), &BasicDescriber::new())
            .expect("render");
        let first = page.find("Item #12").expect("item 12");
        let second = page.find("Item #90").expect("item 90");
        assert!(first < second);
    }

    #[test]
    fn names_are_escaped() {
        let template = HtmlTemplate::new("<b>{{player-name}}</b>").expect("template");
        let page = template
            .render("<script>", &ItemCollectionView::default(), &BasicDescriber::new())
            .expect("render");
        assert_eq!(page, "<b>&lt;script&gt;</b>");
    }

    /// Describes every item with the same fixed text.
    struct RawNames(&'static str);

    impl ItemDescriber for RawNames {
        fn base_name(&self, _item: &ItemSnapshot) -> String {
            self.0.to_string()
        }

        fn full_name(&self, _item: &ItemSnapshot) -> String {
            self.0.to_string()
        }

        fn color(&self, _item: &ItemSnapshot) -> String {
            "#FFFFFF".into()
        }

        fn runeword_name(&self, _runeword_id: u16) -> Option<String> {
            None
        }

        fn stat_lines(&self, _item: &ItemSnapshot) -> Vec<String> {
            vec![self.0.to_string()]
        }
    }

    #[test]
    fn placeholder_text_in_names_is_not_expanded() {
        let items = [
            inventory_item(10, 5, ItemQuality::Normal, ItemFlags::IDENTIFIED),
            inventory_item(11, 6, ItemQuality::Normal, ItemFlags::IDENTIFIED),
        ];
        let page = HtmlTemplate::default()
            .render("{{show-cube}}", &view(&items), &RawNames("{{inventory-items}}"))
            .expect("render");

        assert!(page.contains("<h1>{{show-cube}}</h1>"));
        // Two items, one name and one stat line each.
        assert_eq!(page.matches("{{inventory-items}}").count(), 4);
        assert!(page.contains("<section class=\"\"><h2>Horadric Cube</h2>"));
    }

    #[test]
    fn custom_template_uses_item_partial() {
        let template =
            HtmlTemplate::new("<h1>{{player-name}}</h1>{{#each inventory-items}}{{> item}}{{/each}}")
                .expect("template");
        let items = [inventory_item(10, 5, ItemQuality::Normal, ItemFlags::IDENTIFIED)];
        let page = template
            .render("Vexia", &view(&items), &BasicDescriber::new())
            .expect("render");
        assert!(page.starts_with("<h1>Vexia</h1><div class=\"item\">"));
        assert!(page.contains("Item #5"));
    }

    #[test]
    fn template_without_name_is_rejected() {
        assert!(matches!(HtmlTemplate::new("<html></html>"), Err(ExportError::Template(_))));
    }

    #[test]
    fn template_that_does_not_compile_is_rejected() {
        assert!(matches!(
            HtmlTemplate::new("{{player-name}}{{#each inventory-items}}"),
            Err(ExportError::Template(_))
        ));
    }
}

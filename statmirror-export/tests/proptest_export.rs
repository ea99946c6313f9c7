//! Property tests for text handling in the exporters.

use proptest::prelude::*;

use statmirror_export::exporter::file_stem;
use statmirror_core::classify::ItemCollectionView;
use statmirror_export::{BasicDescriber, HtmlTemplate};

proptest! {
    #[test]
    fn rendered_names_carry_no_markup(name in any::<String>()) {
        let template = HtmlTemplate::new("[{{player-name}}]").expect("template");
        let page = template
            .render(&name, &ItemCollectionView::default(), &BasicDescriber::new())
            .expect("render");
        prop_assert!(!page.contains('<'));
        prop_assert!(!page.contains('>'));
        prop_assert!(!page.contains('"'));
    }

    #[test]
    fn file_stems_stay_inside_output_dir(name in "\\PC{0,24}") {
        if let Ok(stem) = file_stem(&name) {
            prop_assert!(!stem.is_empty());
            prop_assert!(stem
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }

    #[test]
    fn plain_names_kept_verbatim(name in "[A-Za-z][A-Za-z0-9_-]{1,14}") {
        prop_assert_eq!(file_stem(&name).ok(), Some(name.clone()));
    }
}

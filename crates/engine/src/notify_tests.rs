// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::model::Item;

use super::*;

fn item() -> Item {
    Item {
        id: "i1".to_owned(),
        title: "road bike".to_owned(),
        price: 1500.0,
        url: "https://example.com/i1".to_owned(),
        location: "Hangzhou".to_owned(),
        publish_time: None,
        images: Vec::new(),
        seller: String::new(),
        category: String::new(),
        query: "bike".to_owned(),
        site: "goofish".to_owned(),
    }
}

#[test]
fn caption_contains_title_price_location_url() {
    let caption = render_item_caption(&item());
    assert!(caption.contains("road bike"));
    assert!(caption.contains("1500"));
    assert!(caption.contains("Hangzhou"));
    assert!(caption.contains("https://example.com/i1"));
}

#[test]
fn caption_handles_empty_title() {
    let mut i = item();
    i.title = String::new();
    assert!(render_item_caption(&i).contains("(no title)"));
}

#[test]
fn caption_omits_age_without_publish_time() {
    let caption = render_item_caption(&item());
    assert!(!caption.contains("listed"));
}

#[tokio::test]
async fn log_notifier_never_errors() -> anyhow::Result<()> {
    let notifier = LogNotifier;
    notifier.send_text(1, "hello".to_owned()).await?;
    notifier.send_photo(1, "u".to_owned(), "c".to_owned()).await?;
    notifier.send_admin("notice".to_owned()).await?;
    Ok(())
}

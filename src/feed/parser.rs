use feed_rs::parser;

/// Normalized view of a remote feed, valid for one cycle.
///
/// `root_updated_at` always exists: the detection algorithm compares it
/// against stored watermarks, so a feed without a usable timestamp gets the
/// fallback chain below rather than a null.
#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub title: String,
    pub root_updated_at: i64,
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Clone)]
pub struct FeedItem {
    pub title: String,
    pub link: Option<String>,
    pub published_at: Option<i64>,
}

/// Parse an RSS/Atom document into a [`FetchedFeed`].
///
/// The feed-level update time falls back to the first (most recent) item's
/// published-or-updated time when the document does not declare one, and to
/// epoch zero when no timestamp exists anywhere. Epoch zero never exceeds a
/// stored watermark, so a completely undated feed goes quiet instead of
/// re-announcing its top item on every cycle.
pub fn parse_document(bytes: &[u8]) -> Result<FetchedFeed, parser::ParseFeedError> {
    let feed = parser::parse(bytes)?;

    let title = feed
        .title
        .map(|t| t.content)
        .unwrap_or_else(|| "Untitled".to_string());

    let items: Vec<FeedItem> = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry.links.first().map(|l| l.href.clone());
            let published_at = entry
                .published
                .or(entry.updated)
                .map(|dt| dt.timestamp());
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "Untitled".to_string());

            FeedItem {
                title,
                link,
                published_at,
            }
        })
        .collect();

    let root_updated_at = match feed.updated.map(|dt| dt.timestamp()) {
        Some(ts) => ts,
        None => match items.first().and_then(|item| item.published_at) {
            Some(ts) => ts,
            None => {
                if !items.is_empty() {
                    tracing::warn!(
                        feed = %title,
                        "feed carries no usable timestamp, treating root update time as epoch zero"
                    );
                }
                0
            }
        },
    };

    Ok(FetchedFeed {
        title,
        root_updated_at,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_time_comes_from_feed_level_updated() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
    <title>Example</title>
    <id>urn:example</id>
    <updated>2024-01-02T00:00:00Z</updated>
    <entry>
        <id>urn:example:1</id>
        <title>First</title>
        <link href="https://example.com/1"/>
        <published>2024-01-01T00:00:00Z</published>
        <updated>2024-01-01T00:00:00Z</updated>
    </entry>
</feed>"#;

        let feed = parse_document(atom.as_bytes()).unwrap();
        assert_eq!(feed.title, "Example");
        // 2024-01-02T00:00:00Z, not the entry's timestamp
        assert_eq!(feed.root_updated_at, 1704153600);
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].link.as_deref(), Some("https://example.com/1"));
    }

    #[test]
    fn root_time_falls_back_to_first_item() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Example</title>
    <item>
        <guid>1</guid>
        <title>Newest</title>
        <link>https://example.com/1</link>
        <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
    </item>
    <item>
        <guid>2</guid>
        <title>Older</title>
        <link>https://example.com/2</link>
        <pubDate>Sun, 31 Dec 2023 00:00:00 GMT</pubDate>
    </item>
</channel></rss>"#;

        let feed = parse_document(rss.as_bytes()).unwrap();
        // 2024-01-01T00:00:00Z from the first item
        assert_eq!(feed.root_updated_at, 1704067200);
        assert_eq!(feed.items.len(), 2);
    }

    #[test]
    fn undated_feed_gets_epoch_zero() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Undated</title>
    <item><guid>1</guid><title>No dates here</title></item>
</channel></rss>"#;

        let feed = parse_document(rss.as_bytes()).unwrap();
        assert_eq!(feed.root_updated_at, 0);
        assert_eq!(feed.items[0].published_at, None);
    }

    #[test]
    fn missing_titles_become_untitled() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item><guid>1</guid><link>https://example.com/1</link></item>
</channel></rss>"#;

        let feed = parse_document(rss.as_bytes()).unwrap();
        assert_eq!(feed.title, "Untitled");
        assert_eq!(feed.items[0].title, "Untitled");
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(parse_document(b"<not valid xml").is_err());
    }
}

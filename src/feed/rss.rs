use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

use super::model::{Feed, FeedItem};
use crate::util::strip_control_chars;

const ITUNES_NS: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Renders a feed as an RSS 2.0 document with iTunes podcast tags.
///
/// Text is XML-escaped and stripped of characters XML cannot carry.
/// Items appear in feed order.
pub fn render_rss(feed: &Feed) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("Failed to write XML declaration")?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:itunes", ITUNES_NS));
    writer
        .write_event(Event::Start(rss))
        .context("Failed to write rss element")?;
    writer
        .write_event(Event::Start(BytesStart::new("channel")))
        .context("Failed to write channel element")?;

    write_text_element(&mut writer, "title", &feed.title)?;
    write_text_element(&mut writer, "link", &feed.link)?;
    write_text_element(&mut writer, "description", &feed.description)?;

    if !feed.image.is_empty() {
        writer
            .write_event(Event::Start(BytesStart::new("image")))
            .context("Failed to write image element")?;
        write_text_element(&mut writer, "url", &feed.image)?;
        write_text_element(&mut writer, "title", &feed.title)?;
        write_text_element(&mut writer, "link", &feed.link)?;
        writer
            .write_event(Event::End(BytesEnd::new("image")))
            .context("Failed to write image end")?;
        write_href_element(&mut writer, "itunes:image", &feed.image)?;
    }

    write_text_element(&mut writer, "itunes:author", &feed.author)?;

    let mut category = BytesStart::new("itunes:category");
    category.push_attribute(("text", strip_control_chars(&feed.category).as_ref()));
    writer
        .write_event(Event::Empty(category))
        .context("Failed to write itunes:category element")?;

    for item in &feed.items {
        write_item(&mut writer, item)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("channel")))
        .context("Failed to write channel end")?;
    writer
        .write_event(Event::End(BytesEnd::new("rss")))
        .context("Failed to write rss end")?;

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).context("Generated RSS contains invalid UTF-8")
}

fn write_item(writer: &mut XmlWriter, item: &FeedItem) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("item")))
        .context("Failed to write item element")?;

    write_text_element(writer, "title", &item.title)?;
    write_text_element(writer, "link", &item.link)?;

    let mut guid = BytesStart::new("guid");
    guid.push_attribute(("isPermaLink", "true"));
    writer
        .write_event(Event::Start(guid))
        .context("Failed to write guid element")?;
    writer
        .write_event(Event::Text(BytesText::new(&strip_control_chars(&item.link))))
        .context("Failed to write guid text")?;
    writer
        .write_event(Event::End(BytesEnd::new("guid")))
        .context("Failed to write guid end")?;

    write_text_element(writer, "description", &item.description)?;

    if let Some(pub_date) = item.pub_date {
        write_text_element(writer, "pubDate", &format_pub_date(pub_date))?;
    }

    if !item.image.is_empty() {
        write_href_element(writer, "itunes:image", &item.image)?;
    }

    if let Some(enclosure) = &item.enclosure {
        let mut element = BytesStart::new("enclosure");
        element.push_attribute(("url", strip_control_chars(&enclosure.url).as_ref()));
        element.push_attribute(("type", enclosure.mime_type));
        element.push_attribute(("length", "0"));
        writer
            .write_event(Event::Empty(element))
            .context("Failed to write enclosure element")?;
        write_text_element(
            writer,
            "itunes:duration",
            &enclosure.duration_secs.to_string(),
        )?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("item")))
        .context("Failed to write item end")?;
    Ok(())
}

fn write_text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .with_context(|| format!("Failed to write {name} element"))?;
    writer
        .write_event(Event::Text(BytesText::new(&strip_control_chars(text))))
        .with_context(|| format!("Failed to write {name} text"))?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .with_context(|| format!("Failed to write {name} end"))?;
    Ok(())
}

fn write_href_element(writer: &mut XmlWriter, name: &str, href: &str) -> Result<()> {
    let mut element = BytesStart::new(name);
    element.push_attribute(("href", strip_control_chars(href).as_ref()));
    writer
        .write_event(Event::Empty(element))
        .with_context(|| format!("Failed to write {name} element"))?;
    Ok(())
}

/// RFC 2822, as RSS `pubDate` requires.
pub fn format_pub_date(date: DateTime<Utc>) -> String {
    date.to_rfc2822()
}

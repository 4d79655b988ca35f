//! Parser for bitcointalk.org (SMF 1.x) pages.

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};

use crate::app::{HarvestError, Result};
use crate::domain::{Board, Member, Message, Topic, TopicPage, GUEST_MEMBER_ID};
use crate::parser::{resolve_timestamp, EntityParser};

const BREADCRUMB: &str = "#bodyarea div > div > div";
const PAGE_LINKS: &str = "#bodyarea > table td.middletext > a, #bodyarea > table td.middletext > b";
const POST_ROWS: &str = "form#quickModForm > table.bordercolor > tbody > tr";

#[derive(Debug, Default, Clone, Copy)]
pub struct BitcointalkParser;

impl BitcointalkParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_post(&self, row: ElementRef<'_>, topic: i64, today: NaiveDate) -> Result<Message> {
        let member = match row.select(&selector("td.poster_info > b > a")?).next() {
            Some(link) => link
                .value()
                .attr("href")
                .and_then(|href| id_after(link_suffix(href), "u="))
                .ok_or_else(|| parse_error("poster link without a member id"))?,
            None => GUEST_MEMBER_ID,
        };

        let subject_link = first(row, "td.td_headerandpost div.subject > a")?;
        let link = subject_link
            .value()
            .attr("href")
            .ok_or_else(|| parse_error("message subject without a link"))?
            .to_string();
        let id = id_after(&link, "#msg")
            .ok_or_else(|| parse_error(format!("no message id in link {}", link)))?;

        let post_time = resolve_timestamp(
            &text_of(first(row, "td.td_headerandpost div.smalltext")?),
            today,
        )?;

        let number = text_of(first(row, "td.td_headerandpost a.message_number")?);
        let position = number
            .trim()
            .trim_start_matches('#')
            .parse::<u32>()
            .map_err(|_| parse_error(format!("bad message number {:?}", number.trim())))?;

        let post = first(row, "div.post")?;
        let (content_no_quote, content_no_quote_plain) = strip_quotes(post);

        Ok(Message {
            id,
            topic,
            member,
            subject: text_of(subject_link).trim().to_string(),
            link,
            position,
            post_time,
            content: post.inner_html().trim().to_string(),
            content_plain: text_of(post),
            content_no_quote,
            content_no_quote_plain,
        })
    }
}

impl EntityParser for BitcointalkParser {
    fn parse_board(&self, html: &str) -> Result<Board> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let name = text_of(first(root, "title")?).trim().to_string();
        let mut id = None;
        let mut parent = None;
        let mut container = None;

        for (href, text) in breadcrumb(root)? {
            let suffix = link_suffix(&href);
            if suffix.is_empty() {
                continue;
            }
            if suffix.starts_with('#') {
                container = Some(text);
                continue;
            }
            let Some(board_id) = id_after(suffix, "board=") else {
                continue;
            };
            if text == name {
                id = Some(board_id);
            } else {
                parent = Some(board_id);
            }
        }

        Ok(Board {
            id: id.ok_or_else(|| parse_error(format!("board page {:?} never links to itself", name)))?,
            name,
            parent,
            container,
        })
    }

    fn parse_profile(&self, html: &str, today: NaiveDate) -> Result<Member> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let id = first(root, "#bodyarea td.windowbg2 > a")?
            .value()
            .attr("href")
            .and_then(|href| id_after(link_suffix(href), "u="))
            .ok_or_else(|| parse_error("profile page without a member link"))?;

        let info = first(root, "#bodyarea td.windowbg > table")?;
        let row_sel = selector("tr")?;
        let cell_sel = selector("td")?;
        let link_sel = selector("a")?;
        let signature_sel = selector("div.signature")?;

        let mut name = None;
        let mut position = None;
        let mut date_registered = None;
        let mut last_active = None;
        let mut email = None;
        let mut website_name = None;
        let mut website_link = None;
        let mut address = None;
        let mut other_contact = None;
        let mut signature = None;

        for row in info.select(&row_sel) {
            let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
            if cells.len() != 2 {
                if let Some(sig) = row.select(&signature_sel).next() {
                    signature = non_empty(sig.inner_html());
                }
                continue;
            }

            let value = text_of(cells[1]).trim().to_string();
            match text_of(cells[0]).trim() {
                "Name:" => name = non_empty(value),
                "Position:" => position = non_empty(value),
                "Date Registered:" => date_registered = Some(resolve_timestamp(&value, today)?),
                "Last Active:" => last_active = Some(resolve_timestamp(&value, today)?),
                "Email:" => email = non_empty(value),
                "Website:" => {
                    website_name = non_empty(value);
                    website_link = cells[1]
                        .select(&link_sel)
                        .next()
                        .and_then(|a| a.value().attr("href"))
                        .and_then(|href| non_empty(href.to_string()));
                }
                "Bitcoin Address:" => address = non_empty(value),
                "Other contact info:" => other_contact = non_empty(value),
                _ => {}
            }
        }

        Ok(Member {
            id,
            name: name.ok_or_else(|| missing_field("Name", id))?,
            position: position.ok_or_else(|| missing_field("Position", id))?,
            date_registered: date_registered.ok_or_else(|| missing_field("Date Registered", id))?,
            last_active: last_active.ok_or_else(|| missing_field("Last Active", id))?,
            email,
            website_name,
            website_link,
            address,
            other_contact,
            signature,
        })
    }

    fn parse_topic_page(&self, html: &str, today: NaiveDate) -> Result<TopicPage> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let name = text_of(first(root, "title")?).trim().to_string();
        let crumbs = breadcrumb(root).map_err(|_| parse_error("page does not have valid topic data"))?;

        let mut id = None;
        let mut board = None;
        for (href, text) in crumbs {
            let suffix = link_suffix(&href);
            if suffix.is_empty() || suffix.starts_with('#') {
                continue;
            }
            if suffix.starts_with("?board") {
                board = id_after(suffix, "board=");
            } else if text == name {
                id = id_after(suffix, "topic=");
            }
        }
        let id = id.ok_or_else(|| parse_error(format!("topic page {:?} never links to itself", name)))?;
        let board = board.ok_or_else(|| parse_error(format!("topic {} has no owning board", id)))?;

        // "Pages: [1] 2 3 ... 31 All": only the numeric entries count.
        let page_count = root
            .select(&selector(PAGE_LINKS)?)
            .filter_map(|node| text_of(node).trim().parse::<u32>().ok())
            .max()
            .unwrap_or(1);

        let subject = text_of(first(root, "td#top_subject")?);
        let read_count = subject
            .rsplit("(Read ")
            .next()
            .and_then(|tail| tail.split(" times)").next())
            .map(|count| count.replace(',', ""))
            .and_then(|count| count.trim().parse::<i64>().ok())
            .ok_or_else(|| parse_error(format!("no read count in {:?}", subject.trim())))?;

        let mut row_class: Option<String> = None;
        let mut messages = Vec::new();
        for row in root.select(&selector(POST_ROWS)?) {
            let Some(class) = row.value().attr("class") else {
                continue;
            };
            let expected = row_class.get_or_insert_with(|| class.to_string());
            if class != expected.as_str() {
                continue;
            }
            messages.push(self.parse_post(row, id, today)?);
        }

        Ok(TopicPage {
            topic: Topic {
                id,
                name,
                board,
                page_count,
                read_count,
            },
            messages,
        })
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| HarvestError::Parse(format!("invalid selector {:?}: {}", css, e)))
}

fn first<'a>(scope: ElementRef<'a>, css: &str) -> Result<ElementRef<'a>> {
    let sel = selector(css)?;
    scope
        .select(&sel)
        .next()
        .ok_or_else(|| parse_error(format!("missing element {:?}", css)))
}

fn breadcrumb(root: ElementRef<'_>) -> Result<Vec<(String, String)>> {
    let nav = first(root, BREADCRUMB)?;
    let link_sel = selector("a.nav")?;
    Ok(nav
        .select(&link_sel)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            Some((href.to_string(), text_of(a).trim().to_string()))
        })
        .collect())
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Query or fragment part of a link, empty for the bare forum index.
fn link_suffix(href: &str) -> &str {
    match href.find(|c: char| c == '?' || c == '#') {
        Some(start) => &href[start..],
        None => "",
    }
}

/// Digits following the first occurrence of `key`.
fn id_after(text: &str, key: &str) -> Option<i64> {
    let start = text.find(key)? + key.len();
    let digits: String = text[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Post body with top-level quote blocks removed, as markup and as text.
fn strip_quotes(post: ElementRef<'_>) -> (String, String) {
    let mut markup = String::new();
    let mut plain = String::new();

    for child in post.children() {
        if let Some(element) = ElementRef::wrap(child) {
            let is_quote = element.value().name() == "div"
                && element
                    .value()
                    .classes()
                    .any(|class| class == "quoteheader" || class == "quote");
            if is_quote {
                continue;
            }
            markup.push_str(&element.html());
            plain.extend(element.text());
        } else if let Some(text) = child.value().as_text() {
            let text: &str = text;
            markup.push_str(&html_escape::encode_text(text).replace('\u{a0}', "&nbsp;"));
            plain.push_str(text);
        }
    }

    (markup.trim().to_string(), plain)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_error(message: impl Into<String>) -> HarvestError {
    HarvestError::Parse(message.into())
}

fn missing_field(label: &str, id: i64) -> HarvestError {
    parse_error(format!("profile {} has no {:?} row", id, label))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD_74: &str = include_str!("../../tests/fixtures/board_74.html");
    const BOARD_7: &str = include_str!("../../tests/fixtures/board_7.html");
    const PROFILE_12: &str = include_str!("../../tests/fixtures/profile_12.html");
    const TOPIC_14: &str = include_str!("../../tests/fixtures/topic_14.html");
    const NOT_A_TOPIC: &str = include_str!("../../tests/fixtures/not_a_topic.html");

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2014, 7, 29).unwrap()
    }

    #[test]
    fn test_parse_board_with_parent() {
        let board = BitcointalkParser::new().parse_board(BOARD_74).unwrap();
        assert_eq!(
            board,
            Board {
                id: 74,
                name: "Legal".into(),
                parent: Some(1),
                container: Some("Bitcoin".into()),
            }
        );
    }

    #[test]
    fn test_parse_top_level_board() {
        let board = BitcointalkParser::new().parse_board(BOARD_7).unwrap();
        assert_eq!(board.id, 7);
        assert_eq!(board.name, "Economics");
        assert_eq!(board.parent, None);
        assert_eq!(board.container.as_deref(), Some("Bitcoin"));
    }

    #[test]
    fn test_parse_profile() {
        let member = BitcointalkParser::new().parse_profile(PROFILE_12, today()).unwrap();

        assert_eq!(member.id, 12);
        assert_eq!(member.name, "nanaimogold");
        assert_eq!(member.position, "Sr. Member");
        assert_eq!(
            member.date_registered,
            NaiveDate::from_ymd_opt(2009, 12, 9).unwrap().and_hms_opt(19, 23, 55).unwrap()
        );
        assert_eq!(member.last_active, today().and_hms_opt(0, 38, 1).unwrap());
        assert_eq!(member.email.as_deref(), Some("hidden"));
        assert_eq!(
            member.website_name.as_deref(),
            Some("Nanaimo Gold Digital Currency Exchange")
        );
        assert_eq!(member.website_link.as_deref(), Some("https://www.nanaimogold.com/"));
        assert_eq!(member.address, None);
        assert_eq!(member.other_contact, None);

        let signature = member.signature.unwrap();
        assert!(signature.starts_with("<a href=\"https://www.nanaimogold.com/\""));
        assert!(signature.ends_with("World's first bitcoin exchange service"));
    }

    #[test]
    fn test_parse_topic_page() {
        let page = BitcointalkParser::new().parse_topic_page(TOPIC_14, today()).unwrap();

        assert_eq!(
            page.topic,
            Topic {
                id: 14,
                name: "Break on the supply's increase".into(),
                board: 7,
                page_count: 1,
                read_count: 3051,
            }
        );
        assert_eq!(page.messages.len(), 2);

        let opening = &page.messages[0];
        assert_eq!(opening.id, 53);
        assert_eq!(opening.topic, 14);
        assert_eq!(opening.member, 16);
        assert_eq!(opening.position, 1);
        assert_eq!(opening.subject, "Break on the supply's increase");
        assert_eq!(opening.link, "https://bitcointalk.org/index.php?topic=14.msg53#msg53");
        assert_eq!(
            opening.post_time,
            NaiveDate::from_ymd_opt(2009, 12, 12).unwrap().and_hms_opt(14, 11, 37).unwrap()
        );
        assert_eq!(opening.content, "The supply will keep <b>increasing</b> for years.");
        assert_eq!(opening.content_plain, "The supply will keep increasing for years.");
        assert_eq!(opening.content_no_quote, opening.content);
        assert_eq!(opening.content_no_quote_plain, opening.content_plain);
    }

    #[test]
    fn test_guest_reply_with_quote() {
        let page = BitcointalkParser::new().parse_topic_page(TOPIC_14, today()).unwrap();
        let reply = &page.messages[1];

        assert_eq!(reply.id, 56);
        assert_eq!(reply.member, GUEST_MEMBER_ID);
        assert!(reply.is_guest_post());
        assert_eq!(reply.position, 2);
        assert_eq!(reply.post_time, today().and_hms_opt(21, 3, 11).unwrap());

        assert!(reply.content.contains("class=\"quote\""));
        assert!(reply.content_plain.contains("Quote from: ribuck"));
        assert_eq!(reply.content_no_quote, "Only until 21 million.");
        assert_eq!(reply.content_no_quote_plain, "Only until 21 million.");
    }

    #[test]
    fn test_non_topic_page_is_a_parse_error() {
        let err = BitcointalkParser::new()
            .parse_topic_page(NOT_A_TOPIC, today())
            .unwrap_err();
        assert!(matches!(err, HarvestError::Parse(_)));
    }

    #[test]
    fn test_board_parser_rejects_error_page() {
        let err = BitcointalkParser::new().parse_board(NOT_A_TOPIC).unwrap_err();
        assert!(matches!(err, HarvestError::Parse(_)));
    }

    #[test]
    fn test_link_helpers() {
        assert_eq!(link_suffix("https://bitcointalk.org/index.php"), "");
        assert_eq!(link_suffix("https://bitcointalk.org/index.php#1"), "#1");
        assert_eq!(link_suffix("https://bitcointalk.org/index.php?board=74.0"), "?board=74.0");

        assert_eq!(id_after("?board=74.0", "board="), Some(74));
        assert_eq!(id_after("?action=profile;u=12;sa=showPosts", "u="), Some(12));
        assert_eq!(id_after("?topic=14.msg56#msg56", "#msg"), Some(56));
        assert_eq!(id_after("?topic=14.0", "board="), None);
    }
}

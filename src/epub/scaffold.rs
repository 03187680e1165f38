//! Fill XML scaffolds: stream a template through `quick-xml`, changing the
//! elements picked out by locators.

use crate::error::Result;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// Picks elements of a scaffold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator<'a> {
    /// Element with this `id`.
    Id(&'a str),
    /// Element with this qualified name, e.g. `dc:title`.
    Tag(&'a str),
    /// Element carrying `attribute="value"`.
    Attr(&'a str, &'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Replace the element content by escaped text.
    Text(String),
    SetAttr(String, String),
    /// Add serialized XML at the end of the element content.
    Append(String),
}

struct Rule<'a> {
    locator: Locator<'a>,
    action: Action,
}

/// A template plus the changes to apply to it.
pub struct Scaffold<'a> {
    template: &'a str,
    rules: Vec<Rule<'a>>,
}

fn attributes(e: &BytesStart) -> Result<Vec<(String, String)>> {
    let mut attrs = Vec::new();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(attrs)
}

impl<'a> Scaffold<'a> {
    pub fn new(template: &'a str) -> Self {
        Self {
            template,
            rules: Vec::new(),
        }
    }

    pub fn text(mut self, locator: Locator<'a>, text: impl Into<String>) -> Self {
        self.rules.push(Rule {
            locator,
            action: Action::Text(text.into()),
        });
        self
    }

    pub fn set_attr(mut self, locator: Locator<'a>, name: &str, value: impl Into<String>) -> Self {
        self.rules.push(Rule {
            locator,
            action: Action::SetAttr(name.to_string(), value.into()),
        });
        self
    }

    pub fn append(mut self, locator: Locator<'a>, xml: impl Into<String>) -> Self {
        self.rules.push(Rule {
            locator,
            action: Action::Append(xml.into()),
        });
        self
    }

    fn actions(&self, name: &str, attrs: &[(String, String)]) -> Vec<&Action> {
        let has = |key: &str, value: &str| attrs.iter().any(|(k, v)| k == key && v == value);
        self.rules
            .iter()
            .filter(|rule| match rule.locator {
                Locator::Id(id) => has("id", id),
                Locator::Tag(tag) => tag == name,
                Locator::Attr(key, value) => has(key, value),
            })
            .map(|rule| &rule.action)
            .collect()
    }

    /// Produce the filled document.
    pub fn render(&self) -> Result<Vec<u8>> {
        let mut reader = Reader::from_str(self.template);
        let mut writer = Writer::new(Vec::new());
        // Appends still owed to each open element.
        let mut open: Vec<Vec<String>> = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) => self.element(&mut reader, &mut writer, &mut open, e, false)?,
                Event::Empty(e) => self.element(&mut reader, &mut writer, &mut open, e, true)?,
                Event::End(e) => {
                    for xml in open.pop().unwrap_or_default() {
                        writer.get_mut().extend_from_slice(xml.as_bytes());
                    }
                    writer.write_event(Event::End(e))?;
                }
                Event::Eof => break,
                other => writer.write_event(other)?,
            }
        }
        Ok(writer.into_inner())
    }

    fn element(
        &self,
        reader: &mut Reader<&[u8]>,
        writer: &mut Writer<Vec<u8>>,
        open: &mut Vec<Vec<String>>,
        e: BytesStart,
        is_empty: bool,
    ) -> Result<()> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut attrs = attributes(&e)?;
        let actions = self.actions(&name, &attrs);
        if actions.is_empty() {
            if is_empty {
                writer.write_event(Event::Empty(e))?;
            } else {
                writer.write_event(Event::Start(e))?;
                open.push(Vec::new());
            }
            return Ok(());
        }

        let mut text = None;
        let mut appends = Vec::new();
        for action in actions {
            match action {
                Action::Text(t) => text = Some(t.clone()),
                Action::SetAttr(k, v) => match attrs.iter_mut().find(|(key, _)| key == k) {
                    Some(existing) => existing.1 = v.clone(),
                    None => attrs.push((k.clone(), v.clone())),
                },
                Action::Append(xml) => appends.push(xml.clone()),
            }
        }
        let mut start = BytesStart::new(name.clone());
        for (k, v) in &attrs {
            start.push_attribute((k.as_str(), v.as_str()));
        }

        if text.is_none() && appends.is_empty() {
            if is_empty {
                writer.write_event(Event::Empty(start))?;
            } else {
                writer.write_event(Event::Start(start))?;
                open.push(Vec::new());
            }
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if let Some(text) = &text {
            if !is_empty {
                reader.read_to_end(e.name())?;
            }
            writer.write_event(Event::Text(BytesText::new(text)))?;
        } else if !is_empty {
            open.push(appends);
            return Ok(());
        }
        for xml in &appends {
            writer.get_mut().extend_from_slice(xml.as_bytes());
        }
        writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<doc xmlns:dc="http://purl.org/dc/elements/1.1/">
  <dc:title>placeholder <b>bold</b></dc:title>
  <meta name="date" content=""/>
  <list id="items"><item>fixed</item></list>
  <empty/>
</doc>"#;

    fn render(scaffold: Scaffold) -> String {
        String::from_utf8(scaffold.render().unwrap()).unwrap()
    }

    #[test]
    fn untouched_template_round_trips() {
        assert_eq!(render(Scaffold::new(TEMPLATE)), TEMPLATE);
    }

    #[test]
    fn fills_by_locator() {
        let out = render(
            Scaffold::new(TEMPLATE)
                .text(Locator::Tag("dc:title"), "A & B")
                .set_attr(Locator::Attr("name", "date"), "content", "2019-01-01")
                .append(Locator::Id("items"), "<item>new</item>")
                .append(Locator::Tag("empty"), "<x/>"),
        );
        insta::assert_snapshot!(out, @r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <doc xmlns:dc="http://purl.org/dc/elements/1.1/">
          <dc:title>A &amp; B</dc:title>
          <meta name="date" content="2019-01-01"/>
          <list id="items"><item>fixed</item><item>new</item></list>
          <empty><x/></empty>
        </doc>
        "#);
    }

    #[test]
    fn attribute_values_are_escaped() {
        let out = render(Scaffold::new("<a href=\"\"/>").set_attr(Locator::Tag("a"), "href", "x?a=1&b=2"));
        assert_eq!(out, r#"<a href="x?a=1&amp;b=2"/>"#);
    }
}

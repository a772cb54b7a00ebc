//! RDF/XML reader
//!
//! Covers the striped syntax vocabularies are published in: node elements
//! (typed or `rdf:Description`) with `rdf:about`, `rdf:ID` or `rdf:nodeID`,
//! property elements with literal text, `rdf:resource`, `rdf:nodeID`,
//! nested node elements or `rdf:parseType="Resource"`, and property
//! attributes. Namespaces and `xml:lang` are scoped per element.

use super::{RDF_NS, Term, Triple};
use crate::{Error, Result, SourceInput};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
/// Unprefixed RDF attributes still found in older vocabularies
const BARE_RDF_ATTRIBUTES: [&str; 6] = ["about", "resource", "ID", "nodeID", "parseType", "datatype"];

type XmlResult<T> = std::result::Result<T, String>;

/// Read every triple from an RDF/XML document
pub(super) fn parse(input: &SourceInput<'_>) -> Result<Vec<Triple>> {
    let content = input.content;
    let syntax = |line: usize, message: String| Error::syntax(input.source_id(), line, message);

    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);
    let mut state = State::default();
    loop {
        let event = reader
            .read_event()
            .map_err(|e| syntax(line_at(content, reader.error_position()), e.to_string()))?;
        let handled = match event {
            Event::Start(e) => state.open(&e),
            Event::Empty(e) => state.open(&e).map(|()| state.close()),
            Event::End(_) => {
                state.close();
                Ok(())
            }
            Event::Text(t) => t
                .unescape()
                .map_err(|e| e.to_string())
                .map(|text| state.text(&text)),
            Event::CData(c) => {
                state.text(&String::from_utf8_lossy(&c));
                Ok(())
            }
            Event::Eof => break,
            _ => Ok(()),
        };
        handled.map_err(|message| syntax(line_at(content, reader.buffer_position()), message))?;
    }
    Ok(state.triples)
}

/// 1-based line of a byte offset
fn line_at<P: TryInto<usize>>(content: &str, position: P) -> usize {
    let end = position.try_into().unwrap_or(usize::MAX).min(content.len());
    content.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

enum Frame {
    /// `rdf:RDF` wrapper; children are node elements
    Root,
    /// Node element; children are property elements
    Node { subject: String },
    /// Property element awaiting its value
    Property {
        subject: String,
        predicate: String,
        lang: Option<String>,
        text: String,
        object: Option<Term>,
    },
    /// Element whose content carries no triples
    Skip,
}

/// Namespace declarations and language of one open element
struct Scope {
    prefixes: Vec<(String, String)>,
    lang: Option<String>,
}

/// What a newly opened element is, given its parent
enum Role {
    Root,
    Node,
    NestedNode,
    Property(String),
    Skip,
}

#[derive(Default)]
struct State {
    triples: Vec<Triple>,
    frames: Vec<Frame>,
    scopes: Vec<Scope>,
    blank_nodes: usize,
}

impl State {
    fn open(&mut self, element: &BytesStart<'_>) -> XmlResult<()> {
        let mut attributes = Vec::new();
        let mut scope = Scope {
            prefixes: Vec::new(),
            lang: self.scopes.last().and_then(|s| s.lang.clone()),
        };
        for attribute in element.attributes() {
            let attribute = attribute.map_err(|e| e.to_string())?;
            let key = utf8(attribute.key.as_ref())?;
            let value = attribute
                .unescape_value()
                .map_err(|e| e.to_string())?
                .into_owned();
            if key == "xmlns" {
                scope.prefixes.push((String::new(), value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                scope.prefixes.push((prefix.to_string(), value));
            } else if key == "xml:lang" {
                scope.lang = Some(value).filter(|l| !l.is_empty());
            } else if !key.starts_with("xml:") {
                attributes.push((key.to_string(), value));
            }
        }
        self.scopes.push(scope);

        let name = self.resolve(utf8(element.name().as_ref())?)?;
        let role = match self.frames.last() {
            None if name == rdf("RDF") => Role::Root,
            None | Some(Frame::Root) => Role::Node,
            Some(Frame::Property { .. }) => Role::NestedNode,
            Some(Frame::Node { subject }) => Role::Property(subject.clone()),
            Some(Frame::Skip) => Role::Skip,
        };
        match role {
            Role::Root => self.frames.push(Frame::Root),
            Role::Skip => self.frames.push(Frame::Skip),
            Role::Node => {
                self.node(&name, &attributes)?;
            }
            Role::NestedNode => {
                let subject = self.node(&name, &attributes)?;
                let parent = self.frames.len() - 2;
                if let Frame::Property { object, .. } = &mut self.frames[parent] {
                    *object = Some(node_term(&subject));
                }
            }
            Role::Property(subject) => self.property(subject, name, &attributes)?,
        }
        Ok(())
    }

    fn close(&mut self) {
        self.scopes.pop();
        if let Some(Frame::Property {
            subject,
            predicate,
            lang,
            text,
            object,
        }) = self.frames.pop()
        {
            let object = object.unwrap_or_else(|| Term::Literal {
                value: text.trim().to_string(),
                lang,
            });
            self.triples.push(Triple {
                subject,
                predicate,
                object,
            });
        }
    }

    fn text(&mut self, content: &str) {
        if let Some(Frame::Property { text, .. }) = self.frames.last_mut() {
            text.push_str(content);
        }
    }

    /// Open a node element and return its subject
    fn node(&mut self, name: &str, attributes: &[(String, String)]) -> XmlResult<String> {
        let mut subject = None;
        let mut properties = Vec::new();
        for (key, value) in attributes {
            let Some(iri) = self.attribute_iri(key)? else {
                continue;
            };
            match iri.strip_prefix(RDF_NS) {
                Some("about") => subject = Some(value.clone()),
                Some("ID") => subject = Some(format!("#{value}")),
                Some("nodeID") => subject = Some(format!("_:{value}")),
                Some("type") => properties.push((iri, Term::Iri(value.clone()))),
                _ => properties.push((iri, self.literal(value))),
            }
        }
        let subject = subject.unwrap_or_else(|| self.fresh_blank());

        if name != rdf("Description") {
            self.push(&subject, rdf("type"), Term::Iri(name.to_string()));
        }
        for (predicate, object) in properties {
            self.push(&subject, predicate, object);
        }
        self.frames.push(Frame::Node {
            subject: subject.clone(),
        });
        Ok(subject)
    }

    /// Open a property element of `subject`
    fn property(&mut self, subject: String, predicate: String, attributes: &[(String, String)]) -> XmlResult<()> {
        let mut object = None;
        let mut parse_type = None;
        for (key, value) in attributes {
            match self.attribute_iri(key)?.as_deref().and_then(|i| i.strip_prefix(RDF_NS)) {
                Some("resource") => object = Some(Term::Iri(value.clone())),
                Some("nodeID") => object = Some(Term::Blank(format!("_:{value}"))),
                Some("parseType") => parse_type = Some(value.as_str()),
                _ => {}
            }
        }

        if let Some(object) = object {
            self.push(&subject, predicate, object);
            self.frames.push(Frame::Skip);
        } else if parse_type == Some("Resource") {
            let blank = self.fresh_blank();
            self.push(&subject, predicate, Term::Blank(blank.clone()));
            self.frames.push(Frame::Node { subject: blank });
        } else {
            let lang = self.scopes.last().and_then(|s| s.lang.clone());
            self.frames.push(Frame::Property {
                subject,
                predicate,
                lang,
                text: String::new(),
                object: None,
            });
        }
        Ok(())
    }

    fn push(&mut self, subject: &str, predicate: String, object: Term) {
        self.triples.push(Triple {
            subject: subject.to_string(),
            predicate,
            object,
        });
    }

    fn literal(&self, value: &str) -> Term {
        Term::Literal {
            value: value.to_string(),
            lang: self.scopes.last().and_then(|s| s.lang.clone()),
        }
    }

    fn fresh_blank(&mut self) -> String {
        self.blank_nodes += 1;
        format!("_:xml{}", self.blank_nodes)
    }

    /// Expand a prefixed name against the open scopes
    fn resolve(&self, qname: &str) -> XmlResult<String> {
        let (prefix, local) = qname.split_once(':').unwrap_or(("", qname));
        if prefix == "xml" {
            return Ok(format!("{XML_NS}{local}"));
        }
        let namespace = self
            .scopes
            .iter()
            .rev()
            .flat_map(|s| s.prefixes.iter().rev())
            .find(|(p, _)| p == prefix)
            .map(|(_, ns)| ns.as_str());
        match namespace {
            Some(ns) => Ok(format!("{ns}{local}")),
            None if prefix.is_empty() => Ok(local.to_string()),
            None => Err(format!("undeclared namespace prefix '{prefix}'")),
        }
    }

    /// Attribute names: prefixed ones expand, bare RDF names map to the RDF
    /// namespace, other bare names are ignored
    fn attribute_iri(&self, key: &str) -> XmlResult<Option<String>> {
        if key.contains(':') {
            self.resolve(key).map(Some)
        } else if BARE_RDF_ATTRIBUTES.contains(&key) {
            Ok(Some(rdf(key)))
        } else {
            Ok(None)
        }
    }
}

fn rdf(local: &str) -> String {
    format!("{RDF_NS}{local}")
}

fn node_term(subject: &str) -> Term {
    if subject.starts_with("_:") {
        Term::Blank(subject.to_string())
    } else {
        Term::Iri(subject.to_string())
    }
}

fn utf8(bytes: &[u8]) -> XmlResult<&str> {
    std::str::from_utf8(bytes).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ufsa_registry::SourceDescriptor;

    fn read(content: &str) -> Result<Vec<Triple>> {
        let d = SourceDescriptor::new("v", "rdf", "v.rdf", "urn:v");
        parse(&SourceInput::new(&d, content))
    }

    const NS: &str = r#"xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:skos="http://www.w3.org/2004/02/skos/core#""#;

    #[test]
    fn test_nested_node_and_language_scope() {
        let xml = format!(
            r#"<rdf:RDF {NS} xml:lang="de">
  <skos:Concept rdf:about="http://ex.org/a">
    <skos:prefLabel>Aktie</skos:prefLabel>
    <skos:narrower>
      <skos:Concept rdf:about="http://ex.org/b" skos:notation="B"/>
    </skos:narrower>
  </skos:Concept>
</rdf:RDF>"#
        );
        let triples = read(&xml).unwrap();

        assert!(triples.contains(&Triple {
            subject: "http://ex.org/a".to_string(),
            predicate: "http://www.w3.org/2004/02/skos/core#prefLabel".to_string(),
            object: Term::Literal {
                value: "Aktie".to_string(),
                lang: Some("de".to_string())
            },
        }));
        assert!(triples.contains(&Triple {
            subject: "http://ex.org/a".to_string(),
            predicate: "http://www.w3.org/2004/02/skos/core#narrower".to_string(),
            object: Term::Iri("http://ex.org/b".to_string()),
        }));
        assert!(triples.iter().any(|t| t.subject == "http://ex.org/b"
            && t.predicate.ends_with("#notation")
            && matches!(&t.object, Term::Literal { value, .. } if value == "B")));
    }

    #[test]
    fn test_parse_type_resource_creates_blank_node() {
        let xml = format!(
            r#"<rdf:RDF {NS}><rdf:Description rdf:about="http://ex.org/a"><skos:note rdf:parseType="Resource"><skos:prefLabel>x</skos:prefLabel></skos:note></rdf:Description></rdf:RDF>"#
        );
        let triples = read(&xml).unwrap();
        assert_eq!(triples.len(), 2);
        assert_eq!(triples[0].object, Term::Blank("_:xml1".to_string()));
        assert_eq!(triples[1].subject, "_:xml1");
    }

    #[test]
    fn test_undeclared_prefix_is_error() {
        let err = read("<rdf:RDF>\n<foo:Bar/></rdf:RDF>").unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
    }

    #[test]
    fn test_mismatched_tags_are_error() {
        let xml = format!("<rdf:RDF {NS}><skos:Concept></rdf:RDF>");
        assert!(read(&xml).is_err());
    }
}

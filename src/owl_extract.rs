//! RDF/XML [`PatternExtractor`] for pattern ontologies.
//!
//! Reads the `owl:Ontology` element's annotations (the CP annotation schema
//! and its `cpas-ext` extension) and the labels of declared classes and
//! properties. Only literal annotation values are used. Namespaces are
//! resolved, so any prefix bound to the right IRI works.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

use odp_search_core::extract::{ExtractionError, PatternExtractor};
use odp_search_core::models::{ExtractedPattern, PatternRecord};

const OWL_NS: &[u8] = b"http://www.w3.org/2002/07/owl#";
const RDFS_NS: &[u8] = b"http://www.w3.org/2000/01/rdf-schema#";
const CPAS_NS: &[u8] = b"http://www.ontologydesignpatterns.org/schemas/cpannotationschema.owl#";
const CPAS_EXT_NS: &[u8] = b"http://xd-protege.com/schemas/cpas-ext.owl#";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vocab {
    Owl,
    Rdfs,
    Cpas,
    CpasExt,
    Other,
}

fn vocab(ns: &ResolveResult) -> Vocab {
    match ns {
        ResolveResult::Bound(Namespace(n)) => {
            let n: &[u8] = n;
            if n == OWL_NS {
                Vocab::Owl
            } else if n == RDFS_NS {
                Vocab::Rdfs
            } else if n == CPAS_NS {
                Vocab::Cpas
            } else if n == CPAS_EXT_NS {
                Vocab::CpasExt
            } else {
                Vocab::Other
            }
        }
        _ => Vocab::Other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Annotation {
    Label,
    Intent,
    Solution,
    Consequences,
    Category,
    Requirements,
    Scenario,
    Image,
}

fn annotation(v: Vocab, local: &[u8]) -> Option<Annotation> {
    match (v, local) {
        (Vocab::Rdfs, b"label") => Some(Annotation::Label),
        (Vocab::Cpas, b"hasIntent") => Some(Annotation::Intent),
        (Vocab::Cpas, b"hasConsequences") => Some(Annotation::Consequences),
        (Vocab::Cpas, b"coversRequirements") => Some(Annotation::Requirements),
        (Vocab::Cpas, b"scenarios") => Some(Annotation::Scenario),
        (Vocab::CpasExt, b"solutionDescription") => Some(Annotation::Solution),
        (Vocab::CpasExt, b"category") => Some(Annotation::Category),
        (Vocab::CpasExt, b"hasImage") => Some(Annotation::Image),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntityKind {
    Class,
    Property,
}

fn entity_kind(v: Vocab, local: &[u8]) -> Option<EntityKind> {
    match (v, local) {
        (Vocab::Owl, b"Class") => Some(EntityKind::Class),
        (Vocab::Owl, b"ObjectProperty") | (Vocab::Owl, b"DatatypeProperty") => {
            Some(EntityKind::Property)
        }
        _ => None,
    }
}

enum Frame {
    Ontology,
    Entity {
        kind: EntityKind,
        iri: Option<String>,
        label: Option<String>,
    },
    Value {
        annotation: Annotation,
        text: String,
    },
    Other,
}

#[derive(Default)]
struct Collected {
    id: Option<String>,
    base: Option<String>,
    name: Option<String>,
    intents: Vec<String>,
    solutions: Vec<String>,
    consequences: Vec<String>,
    categories: Vec<String>,
    cqs: Vec<String>,
    scenarios: Vec<String>,
    image: Option<String>,
    class_labels: Vec<String>,
    property_labels: Vec<String>,
}

impl Collected {
    fn annotate(&mut self, annotation: Annotation, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }
        match annotation {
            Annotation::Label => {
                self.name.get_or_insert(text);
            }
            Annotation::Intent => self.intents.push(text),
            Annotation::Solution => self.solutions.push(text),
            Annotation::Consequences => self.consequences.push(text),
            Annotation::Category => self.categories.push(text),
            Annotation::Requirements => self.cqs.extend(split_questions(&text)),
            Annotation::Scenario => self.scenarios.push(if text.chars().count() > 1 {
                capitalize(&text)
            } else {
                text
            }),
            Annotation::Image => {
                self.image.get_or_insert(text);
            }
        }
    }

    fn entity(&mut self, kind: EntityKind, iri: Option<String>, label: Option<String>) {
        let label = label
            .filter(|l| !l.trim().is_empty())
            .or_else(|| iri.as_deref().map(label_from_iri))
            .filter(|l| !l.is_empty());
        if let Some(label) = label {
            match kind {
                EntityKind::Class => self.class_labels.push(label),
                EntityKind::Property => self.property_labels.push(label),
            }
        }
    }
}

fn joined(parts: Vec<String>) -> Option<String> {
    (!parts.is_empty()).then(|| parts.join("\n\n"))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Split a `coversRequirements` literal into individual questions.
pub fn split_questions(text: &str) -> Vec<String> {
    text.split('?')
        .map(str::trim)
        .filter(|part| part.chars().count() > 1)
        .map(|part| format!("{}?", capitalize(part)))
        .collect()
}

/// Words of an IRI's local name: `hasParticipant` → `has participant`.
pub fn label_from_iri(iri: &str) -> String {
    let local = iri
        .rsplit(|c| c == '#' || c == '/')
        .find(|s| !s.is_empty())
        .unwrap_or(iri);

    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in local.chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words.join(" ")
}

fn attribute(e: &BytesStart, local: &[u8]) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        let key = a.key;
        let matches = if local == b"base" {
            key.as_ref() == b"xml:base"
        } else {
            key.local_name().as_ref() == local
        };
        if matches {
            a.unescape_value().ok().map(|v| v.trim().to_string())
        } else {
            None
        }
    })
}

fn about(e: &BytesStart) -> Option<String> {
    attribute(e, b"about").or_else(|| attribute(e, b"ID").map(|id| format!("#{id}")))
}

/// Extractor for RDF/XML pattern documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct OwlExtractor;

impl OwlExtractor {
    fn open(&self, frames: &[Frame], v: Vocab, e: &BytesStart, acc: &mut Collected) -> Frame {
        let local = e.local_name();
        let local = local.as_ref();
        if acc.base.is_none() {
            acc.base = attribute(e, b"base");
        }

        if v == Vocab::Owl && local == b"Ontology" {
            if acc.id.is_none() {
                acc.id = attribute(e, b"about");
            }
            return Frame::Ontology;
        }
        if let Some(kind) = entity_kind(v, local) {
            return Frame::Entity {
                kind,
                iri: about(e),
                label: None,
            };
        }
        match frames.last() {
            Some(Frame::Ontology) => match annotation(v, local) {
                Some(annotation) => Frame::Value {
                    annotation,
                    text: String::new(),
                },
                None => Frame::Other,
            },
            Some(Frame::Entity { .. }) if annotation(v, local) == Some(Annotation::Label) => {
                Frame::Value {
                    annotation: Annotation::Label,
                    text: String::new(),
                }
            }
            _ => Frame::Other,
        }
    }

    fn close(frame: Frame, frames: &mut [Frame], acc: &mut Collected) {
        match frame {
            Frame::Value { annotation, text } => match frames.last_mut() {
                Some(Frame::Ontology) => acc.annotate(annotation, text),
                Some(Frame::Entity { label, .. }) => {
                    let text = text.trim();
                    if label.is_none() && !text.is_empty() {
                        *label = Some(text.to_string());
                    }
                }
                _ => {}
            },
            Frame::Entity { kind, iri, label } => acc.entity(kind, iri, label),
            Frame::Ontology | Frame::Other => {}
        }
    }

    fn collect(&self, source_name: &str, content: &[u8]) -> Result<Collected, ExtractionError> {
        let mut reader = NsReader::from_reader(content);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut frames: Vec<Frame> = Vec::new();
        let mut acc = Collected::default();

        loop {
            let (ns, event) = reader
                .read_resolved_event_into(&mut buf)
                .map_err(|e| ExtractionError::malformed(source_name, e))?;
            let v = vocab(&ns);
            match event {
                Event::Start(e) => {
                    let frame = self.open(&frames, v, &e, &mut acc);
                    frames.push(frame);
                }
                Event::Empty(e) => {
                    let frame = self.open(&frames, v, &e, &mut acc);
                    Self::close(frame, &mut frames, &mut acc);
                }
                Event::Text(t) => {
                    if let Some(Frame::Value { text, .. }) = frames.last_mut() {
                        let s = t
                            .unescape()
                            .map_err(|e| ExtractionError::malformed(source_name, e))?;
                        text.push_str(&s);
                    }
                }
                Event::CData(c) => {
                    if let Some(Frame::Value { text, .. }) = frames.last_mut() {
                        text.push_str(&String::from_utf8_lossy(&c));
                    }
                }
                Event::End(_) => {
                    if let Some(frame) = frames.pop() {
                        Self::close(frame, &mut frames, &mut acc);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(acc)
    }
}

impl PatternExtractor for OwlExtractor {
    fn extract(&self, source_name: &str, content: &[u8]) -> Result<ExtractedPattern, ExtractionError> {
        let acc = self.collect(source_name, content)?;

        let id = acc
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .or_else(|| acc.base.clone().filter(|b| !b.is_empty()))
            .ok_or_else(|| ExtractionError::missing_id(source_name))?;

        let record = PatternRecord {
            id,
            name: acc.name.unwrap_or_default(),
            image_ref: acc.image,
            intent: joined(acc.intents),
            description: joined(acc.solutions),
            consequences: joined(acc.consequences),
            categories: acc.categories,
            scenarios: acc.scenarios,
            competency_questions: acc.cqs,
            ..Default::default()
        };

        Ok(ExtractedPattern {
            record,
            class_labels: acc.class_labels,
            property_labels: acc.property_labels,
        })
    }
}

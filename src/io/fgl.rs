//! Reading and writing the FGL layout exchange format.
//!
//! FGL is an XML document with root element `<fgl>`: a `<layout>` block
//! carrying name, topology, size, and clocking (including explicit
//! `<zones>` for open schemes), followed by a `<gates>` list in which each
//! `<gate>` records id, type, optional name, location, and the locations
//! feeding into it. Fan-in arity must match the gate type.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::clocking::ClockingScheme;
use crate::coords::{AspectRatio, Coord};
use crate::error::FglError;
use crate::layout::{Layout, Topology};
use crate::network::Operation;

#[derive(Debug, Default)]
struct GateRecord {
    id: Option<u32>,
    gate_type: Option<String>,
    name: Option<String>,
    loc: CoordRecord,
    incoming: Vec<CoordRecord>,
}

#[derive(Debug, Default, Clone, Copy)]
struct CoordRecord {
    x: Option<u32>,
    y: Option<u32>,
    z: Option<u8>,
}

impl CoordRecord {
    fn into_coord(self, context: &str) -> Result<Coord, FglError> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Ok(Coord::with_z(x, y, self.z.unwrap_or(0))),
            _ => Err(FglError::MalformedInput(format!(
                "{context} is missing an x or y element"
            ))),
        }
    }
}

#[derive(Debug, Default)]
struct ZoneRecord {
    x: Option<u32>,
    y: Option<u32>,
    clock: Option<u8>,
}

#[derive(Debug, Default)]
struct Document {
    layout_name: String,
    topology: Option<String>,
    size: CoordRecord,
    clocking_name: Option<String>,
    zones: Vec<ZoneRecord>,
    gates: Vec<GateRecord>,
}

/// Parses an FGL document into a gate-level [`Layout`].
///
/// # Errors
///
/// Fails with [`FglError::MalformedInput`] for missing required elements,
/// unparsable numbers, or fan-in arities that do not match the gate type,
/// and with [`FglError::UnknownClocking`]/[`FglError::UnknownTopology`]
/// for unrecognized identifiers.
pub fn read_fgl_layout(input: &str) -> Result<Layout, FglError> {
    let document = parse_document(input)?;
    build_layout(document)
}

fn parse_document(input: &str) -> Result<Document, FglError> {
    let mut reader = Reader::from_str(input);
    reader.trim_text(true);

    let mut doc = Document::default();
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match name.as_str() {
                    "gate" => doc.gates.push(GateRecord::default()),
                    "zone" => doc.zones.push(ZoneRecord::default()),
                    "signal" => {
                        if let Some(gate) = doc.gates.last_mut() {
                            gate.incoming.push(CoordRecord::default());
                        }
                    }
                    _ => {}
                }
                path.push(name);
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Text(t) => {
                let text = t.unescape()?.into_owned();
                dispatch_text(&mut doc, &path, &text)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(doc)
}

fn dispatch_text(doc: &mut Document, path: &[String], text: &str) -> Result<(), FglError> {
    let element = match path.last() {
        Some(e) => e.as_str(),
        None => return Ok(()),
    };
    let parent = if path.len() >= 2 {
        path[path.len() - 2].as_str()
    } else {
        ""
    };

    match (parent, element) {
        ("layout", "name") => doc.layout_name = text.to_owned(),
        ("layout", "topology") => doc.topology = Some(text.to_owned()),
        ("size", "x") => doc.size.x = Some(parse_number(text, "size x")?),
        ("size", "y") => doc.size.y = Some(parse_number(text, "size y")?),
        ("size", "z") => doc.size.z = Some(parse_number(text, "size z")?),
        ("clocking", "name") => doc.clocking_name = Some(text.to_owned()),
        ("zone", "x") => {
            zone(doc)?.x = Some(parse_number(text, "zone x")?);
        }
        ("zone", "y") => {
            zone(doc)?.y = Some(parse_number(text, "zone y")?);
        }
        ("zone", "clock") => {
            zone(doc)?.clock = Some(parse_number(text, "zone clock")?);
        }
        ("gate", "id") => {
            gate(doc)?.id = Some(parse_number(text, "gate id")?);
        }
        ("gate", "type") => gate(doc)?.gate_type = Some(text.to_owned()),
        ("gate", "name") => gate(doc)?.name = Some(text.to_owned()),
        ("loc", "x") => {
            gate(doc)?.loc.x = Some(parse_number(text, "gate location x")?);
        }
        ("loc", "y") => {
            gate(doc)?.loc.y = Some(parse_number(text, "gate location y")?);
        }
        ("loc", "z") => {
            gate(doc)?.loc.z = Some(parse_number(text, "gate location z")?);
        }
        ("signal", "x") => {
            signal(doc)?.x = Some(parse_number(text, "signal x")?);
        }
        ("signal", "y") => {
            signal(doc)?.y = Some(parse_number(text, "signal y")?);
        }
        ("signal", "z") => {
            signal(doc)?.z = Some(parse_number(text, "signal z")?);
        }
        _ => {}
    }

    Ok(())
}

fn parse_number<T: core::str::FromStr>(text: &str, context: &str) -> Result<T, FglError> {
    text.parse()
        .map_err(|_| FglError::MalformedInput(format!("{context} is not a number: {text}")))
}

fn zone(doc: &mut Document) -> Result<&mut ZoneRecord, FglError> {
    doc.zones
        .last_mut()
        .ok_or_else(|| FglError::MalformedInput("zone content outside a zone element".into()))
}

fn gate(doc: &mut Document) -> Result<&mut GateRecord, FglError> {
    doc.gates
        .last_mut()
        .ok_or_else(|| FglError::MalformedInput("gate content outside a gate element".into()))
}

fn signal(doc: &mut Document) -> Result<&mut CoordRecord, FglError> {
    gate(doc)?
        .incoming
        .last_mut()
        .ok_or_else(|| FglError::MalformedInput("signal content outside a signal element".into()))
}

fn build_layout(doc: Document) -> Result<Layout, FglError> {
    let topology_name = doc
        .topology
        .ok_or_else(|| FglError::MalformedInput("missing topology element".into()))?;
    let topology = Topology::from_str(&topology_name)
        .ok_or(FglError::UnknownTopology(topology_name))?;

    let (x, y) = match (doc.size.x, doc.size.y) {
        (Some(x), Some(y)) => (x, y),
        _ => return Err(FglError::MalformedInput("missing size element".into())),
    };
    let ar = AspectRatio::new(x, y, doc.size.z.unwrap_or(0));

    let clocking_name = doc
        .clocking_name
        .ok_or_else(|| FglError::MalformedInput("missing clocking name".into()))?;
    let mut scheme =
        ClockingScheme::by_name(&clocking_name).ok_or(FglError::UnknownClocking(clocking_name))?;

    for zone in &doc.zones {
        match (zone.x, zone.y, zone.clock) {
            (Some(x), Some(y), Some(clock)) => {
                scheme.assign_phase(Coord::new(x, y), clock);
            }
            _ => {
                return Err(FglError::MalformedInput(
                    "clock zone is missing an x, y, or clock element".into(),
                ))
            }
        }
    }

    let mut layout = Layout::new(ar, scheme, topology).with_name(doc.layout_name);

    for gate in &doc.gates {
        let id = gate
            .id
            .ok_or_else(|| FglError::MalformedInput("gate is missing an id".into()))?;
        let type_name = gate
            .gate_type
            .as_deref()
            .ok_or_else(|| FglError::MalformedInput(format!("gate {id} is missing a type")))?;
        let op = Operation::from_str(type_name).ok_or_else(|| {
            FglError::MalformedInput(format!("gate {id} has unknown type {type_name}"))
        })?;

        if gate.incoming.len() != op.arity() {
            return Err(FglError::MalformedInput(format!(
                "gate {id} of type {type_name} has {} incoming signals, expected {}",
                gate.incoming.len(),
                op.arity()
            )));
        }

        let loc = gate.loc.into_coord(&format!("gate {id} location"))?;
        if !layout.within_bounds(loc) {
            return Err(FglError::MalformedInput(format!(
                "gate {id} lies outside the layout bounds"
            )));
        }

        if op == Operation::Wire {
            layout.assign_wire(loc, id);
        } else {
            layout.assign_gate(loc, op, id, gate.name.clone());
        }

        for signal in &gate.incoming {
            let from = signal.into_coord(&format!("gate {id} signal"))?;
            layout.add_incoming(loc, from);
            layout.add_outgoing(from, loc);
        }
    }

    // normalize connection orders so that semantically equal documents
    // produce equal layouts
    let coords: Vec<Coord> = layout.tiles().map(|(c, _)| c).collect();
    for c in coords {
        if let Some(tile) = layout.tile_mut(c) {
            tile.incoming.sort();
            tile.outgoing.sort();
        }
    }

    Ok(layout)
}

/// Serializes `layout` into an FGL document. Gates are emitted in
/// ascending id order.
pub fn write_fgl_layout(layout: &Layout) -> Result<String, FglError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    start(&mut writer, "fgl")?;

    start(&mut writer, "layout")?;
    text_element(&mut writer, "name", layout.name())?;
    text_element(&mut writer, "topology", layout.topology().as_str())?;
    start(&mut writer, "size")?;
    text_element(&mut writer, "x", &layout.x().to_string())?;
    text_element(&mut writer, "y", &layout.y().to_string())?;
    text_element(&mut writer, "z", &layout.z().to_string())?;
    end(&mut writer, "size")?;
    start(&mut writer, "clocking")?;
    text_element(&mut writer, "name", layout.scheme().name())?;
    if !layout.scheme().is_regular() {
        start(&mut writer, "zones")?;
        for (x, y, clock) in layout.scheme().zones() {
            start(&mut writer, "zone")?;
            text_element(&mut writer, "x", &x.to_string())?;
            text_element(&mut writer, "y", &y.to_string())?;
            text_element(&mut writer, "clock", &clock.to_string())?;
            end(&mut writer, "zone")?;
        }
        end(&mut writer, "zones")?;
    }
    end(&mut writer, "clocking")?;
    end(&mut writer, "layout")?;

    let mut tiles: Vec<_> = layout.tiles().collect();
    tiles.sort_by_key(|(_, t)| t.id);

    start(&mut writer, "gates")?;
    for (c, tile) in tiles {
        start(&mut writer, "gate")?;
        text_element(&mut writer, "id", &tile.id.to_string())?;
        text_element(&mut writer, "type", tile.op.as_str())?;
        if let Some(name) = &tile.name {
            text_element(&mut writer, "name", name)?;
        }
        start(&mut writer, "loc")?;
        text_element(&mut writer, "x", &c.x.to_string())?;
        text_element(&mut writer, "y", &c.y.to_string())?;
        text_element(&mut writer, "z", &c.z.to_string())?;
        end(&mut writer, "loc")?;
        if !tile.incoming.is_empty() {
            start(&mut writer, "incoming")?;
            for from in &tile.incoming {
                start(&mut writer, "signal")?;
                text_element(&mut writer, "x", &from.x.to_string())?;
                text_element(&mut writer, "y", &from.y.to_string())?;
                text_element(&mut writer, "z", &from.z.to_string())?;
                end(&mut writer, "signal")?;
            }
            end(&mut writer, "incoming")?;
        }
        end(&mut writer, "gate")?;
    }
    end(&mut writer, "gates")?;

    end(&mut writer, "fgl")?;

    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), FglError> {
    writer
        .write_event(event)
        .map_err(|e| FglError::MalformedInput(format!("failed to write XML: {e}")))
}

fn start(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), FglError> {
    emit(writer, Event::Start(BytesStart::new(name)))
}

fn end(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), FglError> {
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &str) -> Result<(), FglError> {
    start(writer, name)?;
    emit(writer, Event::Text(BytesText::new(value)))?;
    end(writer, name)
}

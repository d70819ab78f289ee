use nanoplace::io::{read_fgl_layout, write_fgl_layout};
use nanoplace::{Coord, FglError};

const EMPTY_LAYOUT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<fgl>
  <layout>
    <name>Test</name>
    <topology>cartesian</topology>
    <size>
      <x>0</x>
      <y>0</y>
      <z>0</z>
    </size>
    <clocking>
      <name>2DDWave</name>
    </clocking>
  </layout>
</fgl>
"#;

const AND_LAYOUT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<fgl>
  <layout>
    <name>Test</name>
    <topology>cartesian</topology>
    <size>
      <x>2</x>
      <y>1</y>
      <z>0</z>
    </size>
    <clocking>
      <name>2DDWave</name>
    </clocking>
  </layout>
  <gates>
    <gate>
      <id>0</id>
      <type>PI</type>
      <name>pi0</name>
      <loc>
        <x>0</x>
        <y>1</y>
        <z>0</z>
      </loc>
    </gate>
    <gate>
      <id>1</id>
      <type>PI</type>
      <name>pi1</name>
      <loc>
        <x>1</x>
        <y>0</y>
        <z>0</z>
      </loc>
    </gate>
    <gate>
      <id>2</id>
      <type>AND</type>
      <loc>
        <x>1</x>
        <y>1</y>
        <z>0</z>
      </loc>
      <incoming>
        <signal>
          <x>0</x>
          <y>1</y>
          <z>0</z>
        </signal>
        <signal>
          <x>1</x>
          <y>0</y>
          <z>0</z>
        </signal>
      </incoming>
    </gate>
    <gate>
      <id>3</id>
      <type>PO</type>
      <name>po0</name>
      <loc>
        <x>2</x>
        <y>1</y>
        <z>0</z>
      </loc>
      <incoming>
        <signal>
          <x>1</x>
          <y>1</y>
          <z>0</z>
        </signal>
      </incoming>
    </gate>
  </gates>
</fgl>
"#;

const OPEN_LAYOUT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<fgl>
  <layout>
    <name>Open</name>
    <topology>cartesian</topology>
    <size>
      <x>1</x>
      <y>1</y>
      <z>0</z>
    </size>
    <clocking>
      <name>OPEN</name>
      <zones>
        <zone>
          <x>0</x>
          <y>0</y>
          <clock>0</clock>
        </zone>
        <zone>
          <x>1</x>
          <y>0</y>
          <clock>1</clock>
        </zone>
      </zones>
    </clocking>
  </layout>
</fgl>
"#;

#[test]
fn read_empty_layout() {
    let lyt = read_fgl_layout(EMPTY_LAYOUT).unwrap();

    assert_eq!(lyt.x(), 0);
    assert_eq!(lyt.y(), 0);
    assert_eq!(lyt.area(), 1);
    assert_eq!(lyt.name(), "Test");
    assert_eq!(lyt.scheme().name(), "2DDWave");
}

#[test]
fn read_simple_and_layout() {
    let lyt = read_fgl_layout(AND_LAYOUT).unwrap();

    assert_eq!(lyt.x(), 2);
    assert_eq!(lyt.y(), 1);
    assert_eq!(lyt.area(), 6);
    assert_eq!(lyt.name(), "Test");

    assert!(lyt.is_pi_tile(Coord::new(0, 1)));
    assert_eq!(lyt.gate_name(Coord::new(0, 1)), Some("pi0"));
    assert!(lyt.is_pi_tile(Coord::new(1, 0)));
    assert_eq!(lyt.gate_name(Coord::new(1, 0)), Some("pi1"));
    assert!(lyt.is_and(Coord::new(1, 1)));
    assert!(lyt.is_po_tile(Coord::new(2, 1)));
    assert_eq!(lyt.gate_name(Coord::new(2, 1)), Some("po0"));

    // fan-ins of the AND gate were recorded
    let and_tile = lyt.tile(Coord::new(1, 1)).unwrap();
    assert_eq!(and_tile.incoming.len(), 2);
    assert!(and_tile.incoming.contains(&Coord::new(0, 1)));
    assert!(and_tile.incoming.contains(&Coord::new(1, 0)));
}

#[test]
fn read_open_clocking_zones() {
    let lyt = read_fgl_layout(OPEN_LAYOUT).unwrap();

    assert_eq!(lyt.scheme().name(), "OPEN");
    assert!(!lyt.scheme().is_regular());
    assert_eq!(lyt.phase(Coord::new(1, 0)), 1);
    assert_eq!(lyt.phase(Coord::new(0, 0)), 0);
}

#[test]
fn round_trip_preserves_the_layout() {
    for document in [EMPTY_LAYOUT, AND_LAYOUT, OPEN_LAYOUT] {
        let first = read_fgl_layout(document).unwrap();
        let written = write_fgl_layout(&first).unwrap();
        let second = read_fgl_layout(&written).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn unknown_clocking_is_rejected() {
    let document = EMPTY_LAYOUT.replace("2DDWave", "TriangleWave");
    match read_fgl_layout(&document) {
        Err(FglError::UnknownClocking(name)) => assert_eq!(name, "TriangleWave"),
        other => panic!("expected UnknownClocking, got {other:?}"),
    }
}

#[test]
fn unknown_topology_is_rejected() {
    let document = EMPTY_LAYOUT.replace("cartesian", "spherical");
    match read_fgl_layout(&document) {
        Err(FglError::UnknownTopology(name)) => assert_eq!(name, "spherical"),
        other => panic!("expected UnknownTopology, got {other:?}"),
    }
}

#[test]
fn arity_mismatch_is_rejected() {
    // strip the AND gate's second fan-in signal
    let document = AND_LAYOUT.replace(
        r#"        <signal>
          <x>1</x>
          <y>0</y>
          <z>0</z>
        </signal>
"#,
        "",
    );
    assert!(matches!(
        read_fgl_layout(&document),
        Err(FglError::MalformedInput(_))
    ));
}

#[test]
fn missing_zone_fields_are_rejected() {
    let document = OPEN_LAYOUT.replace(
        r#"          <x>0</x>
          <y>0</y>
"#,
        r#"          <y>0</y>
"#,
    );
    assert!(matches!(
        read_fgl_layout(&document),
        Err(FglError::MalformedInput(_))
    ));
}

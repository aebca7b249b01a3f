use std::io::{self, Cursor, Read};

use keybound_protocol::{
    encode, write_message, ElementEntry, FrameReader, IntentMessage, ServerMessage, SpawnEntry,
    StateMessage, WireCell,
};

#[test]
fn broadcast_state_reproduces_elements_on_the_client() {
    let state = sample_state();
    let mut wire = Vec::new();
    write_message(&mut wire, &ServerMessage::State(state.clone())).expect("encodable");

    let mut reader = FrameReader::new(Cursor::new(wire));
    let Some(ServerMessage::State(received)) = reader.read_message().expect("decodable") else {
        panic!("expected a state message");
    };
    assert_eq!(received.elements, state.elements);
    assert_eq!(received.key_map_list, state.key_map_list);
    assert_eq!(received, state);
    assert_eq!(
        reader.read_message::<ServerMessage>().expect("clean close"),
        None
    );
}

#[test]
fn frames_survive_one_byte_reads() {
    let mut wire = Vec::new();
    for cell in [WireCell::new(0, 1), WireCell::new(4, 2)] {
        wire.extend(
            encode(&IntentMessage {
                selected_card: Some("Cross".to_owned()),
                selected_cell: Some(cell),
                ..IntentMessage::default()
            })
            .expect("encodable"),
        );
    }

    let mut reader = FrameReader::new(Trickle(Cursor::new(wire)));
    let cells: Vec<Option<WireCell>> = (0..2)
        .map(|_| {
            reader
                .read_message::<IntentMessage>()
                .expect("decodable")
                .expect("frame present")
                .selected_cell
        })
        .collect();
    assert_eq!(
        cells,
        vec![Some(WireCell::new(0, 1)), Some(WireCell::new(4, 2))]
    );
}

#[test]
fn malformed_frame_does_not_poison_the_stream() {
    let mut wire = b"{not json}\n".to_vec();
    wire.extend(encode(&IntentMessage {
        skip: true,
        ..IntentMessage::default()
    })
    .expect("encodable"));

    let mut reader = FrameReader::new(Cursor::new(wire));
    let error = reader
        .read_message::<IntentMessage>()
        .expect_err("first frame is garbage");
    assert!(!error.is_fatal());
    let intent = reader
        .read_message::<IntentMessage>()
        .expect("second frame decodes")
        .expect("frame present");
    assert!(intent.skip);
}

fn sample_state() -> StateMessage {
    StateMessage {
        player_count: 2,
        current_player: 1,
        map: "meadow".to_owned(),
        cards: vec!["Left1".to_owned(), "Right1".to_owned()],
        keys: vec!["blue key".to_owned()],
        player_number: 2,
        possible_moves: vec![WireCell::new(3, 4)],
        elements: vec![
            ElementEntry {
                name: "Gork".to_owned(),
                health: 100,
                row: 3,
                column: 3,
            },
            ElementEntry {
                name: "Skeleton1".to_owned(),
                health: -4,
                row: 7,
                column: 1,
            },
        ],
        card_map_list: vec![SpawnEntry {
            name: "Cross".to_owned(),
            row: 2,
            column: 9,
            spawn_id: 31,
        }],
        key_map_list: vec![SpawnEntry {
            name: "blue key".to_owned(),
            row: 0,
            column: 5,
            spawn_id: 11,
        }],
    }
}

/// Reader that hands out a single byte per call.
struct Trickle<R>(R);

impl<R: Read> Read for Trickle<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match buf.first_mut() {
            Some(slot) => self.0.read(std::slice::from_mut(slot)),
            None => Ok(0),
        }
    }
}

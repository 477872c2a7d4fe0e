//! End-to-end pipeline tests: server bytes in, frames out.
//!
//! Every scenario is replayed plain and compressed, whole and split at
//! arbitrary points, and must always produce the same frames.

use mysqlwire::frame::column::encode_column_definition;
use mysqlwire::frame::handshake::encode_handshake;
use mysqlwire::frame::{
    ColumnDefinitionOrEofDecoder, DynamicRowOrEofDecoder, HandshakeDecoder, HandshakeV10,
    ResponseDecoder, RowFormat, RowOrEofDecoder, StmtPrepareResponseDecoder,
};
use mysqlwire::protocol::capabilities::{
    CLIENT_PLUGIN_AUTH, CLIENT_PROTOCOL_41, CLIENT_SECURE_CONNECTION,
};
use mysqlwire::protocol::{PayloadWriter, command};
use mysqlwire::types::column_flags;
use mysqlwire::{
    ColumnDefinition, FieldType, Frame, FrameDecoder, PacketReader, PacketWriter,
    ProtocolConfig, Value,
};
use proptest::prelude::*;

fn columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::of_type(
            "id",
            FieldType::LongLong,
            column_flags::NOT_NULL | column_flags::UNSIGNED | column_flags::PRIMARY_KEY,
        ),
        ColumnDefinition::of_type("name", FieldType::VarString, 0),
        ColumnDefinition::of_type("score", FieldType::Double, 0),
    ]
}

fn greeting() -> HandshakeV10 {
    let mut auth_data: Vec<u8> = b"abcdefghijklmnopqrst".to_vec();
    auth_data.push(0);
    HandshakeV10 {
        protocol_version: 10,
        server_version: "8.4.0".to_string(),
        connection_id: 11,
        auth_data,
        capabilities: CLIENT_PROTOCOL_41 | CLIENT_SECURE_CONNECTION | CLIENT_PLUGIN_AUTH,
        charset: 255,
        status: 0x0002,
        auth_plugin: "caching_sha2_password".to_string(),
        sequence_id: 0,
    }
}

fn eof(status: u16) -> Vec<u8> {
    let mut writer = PayloadWriter::new();
    writer.write_u8(0xFE).write_u16_le(0).write_u16_le(status);
    writer.into_bytes()
}

fn text_row(values: &[Option<&str>]) -> Vec<u8> {
    let mut writer = PayloadWriter::new();
    for value in values {
        match value {
            Some(v) => writer.write_lenenc_bytes(v.as_bytes()),
            None => writer.write_u8(0xFB),
        };
    }
    writer.into_bytes()
}

/// Greeting, auth OK, then a text result set.
fn conversation() -> Vec<(Vec<u8>, u8)> {
    let mut packets = vec![
        (encode_handshake(&greeting()), 0),
        (vec![0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00], 2),
        (vec![0x03], 1),
    ];
    let mut seq = 2;
    for column in columns() {
        packets.push((encode_column_definition(&column), seq));
        seq += 1;
    }
    packets.push((eof(0x0002), seq));
    packets.push((text_row(&[Some("1"), Some("alice"), Some("1.5")]), seq + 1));
    packets.push((text_row(&[Some("18446744073709551615"), None, None]), seq + 2));
    packets.push((eof(0x0002), seq + 3));
    packets
}

fn conversation_decoders() -> Vec<Box<dyn FrameDecoder>> {
    let mut decoders: Vec<Box<dyn FrameDecoder>> = vec![
        Box::new(HandshakeDecoder),
        Box::new(ResponseDecoder),
        Box::new(ResponseDecoder),
    ];
    for _ in 0..4 {
        decoders.push(Box::new(ColumnDefinitionOrEofDecoder));
    }
    for _ in 0..3 {
        decoders.push(Box::new(RowOrEofDecoder::new(3)));
    }
    decoders
}

fn server_bytes(config: &ProtocolConfig, packets: &[(Vec<u8>, u8)]) -> Vec<u8> {
    let mut writer = config.packet_writer();
    let mut bytes = Vec::new();
    for (payload, seq) in packets {
        bytes.extend(writer.write(payload, *seq).unwrap());
    }
    bytes
}

/// Feed `bytes` cut at `cuts`, pulling frames after every chunk.
fn replay(
    config: &ProtocolConfig,
    bytes: &[u8],
    cuts: &[usize],
    mut decoders: Vec<Box<dyn FrameDecoder>>,
) -> Vec<Frame> {
    let mut reader = config.packet_reader();
    let mut frames = Vec::new();
    let mut start = 0;

    let mut bounds: Vec<usize> = cuts.iter().copied().filter(|&c| c <= bytes.len()).collect();
    bounds.sort_unstable();
    bounds.push(bytes.len());

    for end in bounds {
        reader.append(&bytes[start..end]).unwrap();
        start = end;
        while frames.len() < decoders.len() && reader.has_packet() {
            match reader.read_frame(decoders[frames.len()].as_mut()).unwrap() {
                Some(frame) => frames.push(frame),
                None => break,
            }
        }
    }

    assert!(!reader.has_packet(), "undelivered packets left");
    frames
}

fn configs() -> [ProtocolConfig; 2] {
    [
        ProtocolConfig::new(),
        ProtocolConfig::new()
            .compression(true)
            .compression_threshold(0),
    ]
}

#[test]
fn test_conversation_frames() {
    for config in configs() {
        let bytes = server_bytes(&config, &conversation());
        let frames = replay(&config, &bytes, &[], conversation_decoders());
        assert_eq!(frames.len(), 10);

        assert_eq!(frames[0], Frame::Handshake(greeting()));
        assert!(matches!(&frames[1], Frame::Ok(ok) if ok.sequence_id == 2));
        assert!(matches!(
            &frames[2],
            Frame::ResultSetHeader(header) if header.column_count == 3
        ));
        for (frame, expected) in frames[3..6].iter().zip(columns()) {
            assert_eq!(frame, &Frame::ColumnDefinition(expected));
        }
        assert!(matches!(&frames[6], Frame::Eof(_)));

        let Frame::TextRow(row) = &frames[7] else {
            panic!("expected text row, got {:?}", frames[7]);
        };
        assert_eq!(
            row.decode_values(&columns()),
            vec![
                Value::UInt(1),
                Value::Text("alice".to_string()),
                Value::Double(1.5)
            ]
        );

        let Frame::TextRow(row) = &frames[8] else {
            panic!("expected text row, got {:?}", frames[8]);
        };
        assert_eq!(
            row.decode_values(&columns()),
            vec![Value::UInt(u64::MAX), Value::Null, Value::Null]
        );
        assert!(frames[9].is_terminal());
    }
}

#[test]
fn test_conversation_bytewise() {
    for config in configs() {
        let bytes = server_bytes(&config, &conversation());
        let cuts: Vec<usize> = (1..bytes.len()).collect();
        let whole = replay(&config, &bytes, &[], conversation_decoders());
        assert_eq!(replay(&config, &bytes, &cuts, conversation_decoders()), whole);
    }
}

/// Prepare, execute and read binary rows through the dynamic decoder.
#[test]
fn test_prepared_statement_exchange() {
    let columns = vec![
        ColumnDefinition::of_type("n", FieldType::Tiny, 0),
        ColumnDefinition::of_type("at", FieldType::DateTime, 0),
    ];

    let mut prepare_ok = PayloadWriter::new();
    prepare_ok
        .write_u8(0x00)
        .write_u32_le(9)
        .write_u16_le(2)
        .write_u16_le(0)
        .write_u8(0)
        .write_u16_le(0);

    let mut row = PayloadWriter::new();
    row.write_u8(0x00)
        .write_u8(0x00)
        .write_u8(0xFF)
        .write_bytes(&[7, 0xE8, 0x07, 3, 1, 12, 30, 0]);
    let mut null_row = PayloadWriter::new();
    null_row.write_u8(0x00).write_u8(0b0000_1000).write_u8(0x05);

    let packets = vec![
        (prepare_ok.into_bytes(), 1),
        (encode_column_definition(&columns[0]), 2),
        (encode_column_definition(&columns[1]), 3),
        (eof(0), 4),
        (vec![0x02], 1),
        (encode_column_definition(&columns[0]), 2),
        (encode_column_definition(&columns[1]), 3),
        (eof(0), 4),
        (row.into_bytes(), 5),
        (null_row.into_bytes(), 6),
        (eof(0), 7),
    ];

    for config in configs() {
        let bytes = server_bytes(&config, &packets);
        let mut reader = config.packet_reader();
        reader.append(&bytes).unwrap();

        let Some(Frame::StmtPrepareOk(ok)) =
            reader.read_frame(&mut StmtPrepareResponseDecoder).unwrap()
        else {
            panic!("expected COM_STMT_PREPARE OK");
        };
        assert_eq!((ok.statement_id, ok.num_columns, ok.num_params), (9, 2, 0));
        for _ in 0..3 {
            assert!(reader.read_frame(&mut ColumnDefinitionOrEofDecoder).unwrap().is_some());
        }

        // the execute request the replies answer
        let request = command::stmt_execute(ok.statement_id, &[], 0);
        assert_eq!(request[0], 0x17);

        assert!(matches!(
            reader.read_frame(&mut ResponseDecoder).unwrap(),
            Some(Frame::ResultSetHeader(_))
        ));
        for _ in 0..3 {
            assert!(reader.read_frame(&mut ColumnDefinitionOrEofDecoder).unwrap().is_some());
        }

        let mut rows = DynamicRowOrEofDecoder::new(columns.clone());
        assert_eq!(
            reader.read_frame(&mut rows).unwrap(),
            Some(Frame::BinaryRow(mysqlwire::frame::BinaryRow {
                values: vec![
                    Value::Int(-1),
                    Value::Text("2024-03-01 12:30:00".to_string())
                ]
            }))
        );
        assert_eq!(rows.format(), Some(RowFormat::Binary));
        assert_eq!(
            reader.read_frame(&mut rows).unwrap(),
            Some(Frame::BinaryRow(mysqlwire::frame::BinaryRow {
                values: vec![Value::Int(5), Value::Null]
            }))
        );
        assert!(matches!(reader.read_frame(&mut rows).unwrap(), Some(Frame::Eof(_))));
        assert!(!reader.has_packet());
    }
}

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn test_payload_lengths_round_trip() {
    let lengths = [0, 1, 250, 251, 65_535, 16_777_215, 16_777_216];
    for config in configs() {
        for len in lengths {
            let payload = patterned(len);
            let bytes = config.packet_writer().write(&payload, 0).unwrap();

            let mut reader = config.packet_reader();
            let mut decoded = None;
            for chunk in bytes.chunks(1 << 20) {
                reader.append(chunk).unwrap();
                if decoded.is_none() && reader.has_packet() {
                    decoded = reader
                        .read_payload(|p, _, _| p.read_rest_of_packet_string())
                        .unwrap();
                }
            }

            assert_eq!(
                decoded.as_deref().map(<[u8]>::len),
                Some(len),
                "length {len}, compressed {}",
                config.compression
            );
            assert!(decoded.as_deref() == Some(payload.as_slice()));
            assert!(!reader.has_packet(), "length {len}");
        }
    }
}

#[test]
fn test_length_encoded_integers_round_trip() {
    let values = [
        0,
        250,
        251,
        65_535,
        65_536,
        16_777_215,
        16_777_216,
        (1u64 << 63) + 1,
        u64::MAX,
    ];
    let mut payload = PayloadWriter::new();
    for value in values {
        payload.write_lenenc_int(value);
    }
    payload.write_u8(0xFB);

    for config in configs() {
        let bytes = config.packet_writer().write(payload.as_bytes(), 0).unwrap();
        let mut reader = config.packet_reader();
        reader.append(&bytes).unwrap();

        let decoded = reader
            .read_payload(|p, _, _| {
                let mut out = Vec::new();
                for _ in 0..=values.len() {
                    out.push(p.read_length_encoded_integer_or_null()?);
                }
                Ok(out)
            })
            .unwrap()
            .unwrap();

        let mut expected: Vec<Option<u64>> = values.iter().copied().map(Some).collect();
        expected.push(None);
        assert_eq!(decoded, expected);
    }
}

proptest! {
    /// Frames do not depend on how the transport slices the stream.
    #[test]
    fn prop_fragmentation_invariance(
        compressed in any::<bool>(),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..12),
    ) {
        let configs = configs();
        let config = &configs[usize::from(compressed)];
        let bytes = server_bytes(config, &conversation());
        let cuts: Vec<usize> = cuts.iter().map(|c| c.index(bytes.len())).collect();

        let whole = replay(config, &bytes, &[], conversation_decoders());
        let split = replay(config, &bytes, &cuts, conversation_decoders());
        prop_assert_eq!(split, whole);
    }

    /// Retrying a decode on the same partial data changes nothing.
    #[test]
    fn prop_retry_is_idempotent(
        cut in any::<prop::sample::Index>(),
        retries in 1..5usize,
        message in "[a-z ]{0,300}",
    ) {
        let mut payload = b"\xFF\x15\x04#28000".to_vec();
        payload.extend_from_slice(message.as_bytes());
        let config = ProtocolConfig::new();
        let bytes = config.packet_writer().write(&payload, 2).unwrap();
        let cut = cut.index(bytes.len());

        let mut reader = config.packet_reader();
        reader.append(&bytes[..cut]).unwrap();
        for _ in 0..retries {
            if reader.has_packet() {
                prop_assert_eq!(reader.read_frame(&mut ResponseDecoder).unwrap(), None);
            }
        }
        reader.append(&bytes[cut..]).unwrap();

        let Some(Frame::Err(err)) = reader.read_frame(&mut ResponseDecoder).unwrap() else {
            panic!("expected ERR packet");
        };
        prop_assert_eq!(err.error_code, 1045);
        prop_assert_eq!(err.sql_state.as_str(), "28000");
        prop_assert_eq!(err.error_message, message);
        prop_assert!(!reader.has_packet());
    }
}

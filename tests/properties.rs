//! Property-based tests for the line protocol.
//!
//! Uses proptest to check framing invariants over arbitrary byte streams
//! and arbitrary chunkings of them.

use proptest::prelude::*;
use serialwire::{Command, CommandBuffer, CommandBuilder};

/// Bytes drawn from a small alphabet so separators and terminators are common.
fn wire_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        prop::sample::select(vec![b'a', b'b', b'7', b'-', b' ', b'\n']),
        0..256,
    )
}

fn line_text() -> impl Strategy<Value = String> {
    "[a-c0-9 ]{0,24}"
}

fn decode_all(buffer: &mut CommandBuffer, data: &[u8]) -> Vec<Command> {
    buffer.push(data)
}

proptest! {
    /// Feeding bytes in any chunking yields the same commands as one chunk.
    #[test]
    fn chunk_boundary_invariance(
        data in wire_bytes(),
        sizes in prop::collection::vec(1usize..17, 1..64),
    ) {
        let mut whole = CommandBuffer::new();
        let expected = decode_all(&mut whole, &data);

        let mut chunked = CommandBuffer::new();
        let mut actual = Vec::new();
        let mut offset = 0;
        let mut i = 0;
        while offset < data.len() {
            let end = (offset + sizes[i % sizes.len()]).min(data.len());
            actual.extend(decode_all(&mut chunked, &data[offset..end]));
            offset = end;
            i += 1;
        }

        prop_assert_eq!(actual, expected);
        prop_assert_eq!(chunked.len(), whole.len());
    }

    /// A chunk with K terminators completes exactly K commands.
    #[test]
    fn one_command_per_terminator(data in wire_bytes()) {
        let mut buffer = CommandBuffer::new();
        let terminators = data.iter().filter(|&&b| b == b'\n').count();

        prop_assert_eq!(buffer.append(&data), terminators);

        let mut extracted = 0;
        while buffer.has_command() {
            buffer.extract_command().unwrap();
            extracted += 1;
        }
        prop_assert_eq!(extracted, terminators);

        // Only the unterminated tail is left
        let tail = data.iter().rev().take_while(|&&b| b != b'\n').count();
        prop_assert_eq!(buffer.len(), tail);
    }

    /// Every separator is a boundary, including leading, trailing and repeated ones.
    #[test]
    fn empty_fields_preserved(line in line_text()) {
        let mut buffer = CommandBuffer::new();
        let mut data = line.clone().into_bytes();
        data.push(b'\n');

        let commands = buffer.push(&data);
        prop_assert_eq!(commands.len(), 1);

        let expected: Vec<&str> = line.split(' ').collect();
        prop_assert_eq!(commands[0].field_count(), expected.len());
        prop_assert_eq!(commands[0].fields(), &expected[..]);
    }

    /// Building fields and decoding the bytes gives the same fields back.
    #[test]
    fn build_decode_round_trip(fields in prop::collection::vec("[a-z0-9]{0,6}", 1..8)) {
        let mut builder = CommandBuilder::new();
        for field in &fields {
            builder.append(field.as_str());
        }

        let bytes = builder.finish();
        prop_assert_eq!(bytes.iter().filter(|&&b| b == b'\n').count(), 1);
        prop_assert_eq!(bytes.last(), Some(&b'\n'));

        let mut buffer = CommandBuffer::new();
        let commands = buffer.push(&bytes);
        prop_assert_eq!(commands.len(), 1);
        prop_assert_eq!(commands[0].fields(), &fields[..]);
    }

    /// Numeric fields survive encode and decode.
    #[test]
    fn numeric_round_trip(n in any::<i64>(), x in prop::num::f64::NORMAL) {
        let mut builder = CommandBuilder::command("num");
        builder.append(n).append(x);

        let mut buffer = CommandBuffer::new();
        let commands = buffer.push(&builder.finish());

        prop_assert_eq!(commands[0].field_as_integer(1).unwrap(), n);
        prop_assert_eq!(commands[0].field_as_float(2).unwrap(), x);
    }
}

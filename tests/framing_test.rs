// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 分帧与解析的性质测试：无论数据在何处被切分，得到的报文都与一次性喂入时完全相同。

use proptest::prelude::*;
use rawhttp::{FrameBuffer, FrameState, MessageParser};

/// 把报文在给定的位置切成若干块
fn split_at_points(message: &[u8], mut points: Vec<usize>) -> Vec<&[u8]> {
    points.retain(|&p| p > 0 && p < message.len());
    points.sort_unstable();
    points.dedup();

    let mut chunks = Vec::new();
    let mut last = 0;
    for p in points {
        chunks.push(&message[last..p]);
        last = p;
    }
    chunks.push(&message[last..]);
    chunks
}

/// 逐块喂入，收集所有切出的报文
fn feed_chunks(chunks: &[&[u8]]) -> (Vec<String>, FrameBuffer) {
    let mut framer = FrameBuffer::default();
    let frames = chunks.iter().filter_map(|chunk| framer.feed(chunk)).collect();
    (frames, framer)
}

fn http_message() -> impl Strategy<Value = (String, String)> {
    (
        prop::sample::select(vec!["GET", "POST", "PUT", "DELETE", "PATCH", "get", "Post"]),
        "/[a-z0-9/]{0,16}",
        prop::collection::vec(("X-[A-Za-z]{1,8}", "[A-Za-z0-9 ,;=]{0,16}"), 0..4),
        "[A-Za-z0-9 {}:,\"\n]{0,64}",
    )
        .prop_map(|(method, path, headers, body)| {
            let mut head = format!("{} {} HTTP/1.1\r\nHost: localhost\r\n", method, path);
            for (name, value) in headers {
                head.push_str(&format!("{}: {}\r\n", name, value));
            }
            if !body.is_empty() {
                head.push_str(&format!("Content-Length: {}\r\n", body.len()));
            }
            head.push_str("\r\n");
            (head, body)
        })
}

proptest! {
    #[test]
    fn http_frame_is_independent_of_chunking(
        (head, body) in http_message(),
        points in prop::collection::vec(0usize..256, 0..12),
    ) {
        let message = format!("{}{}", head, body);
        let chunks = split_at_points(message.as_bytes(), points);

        let (whole, _) = feed_chunks(&[message.as_bytes()]);
        let (split, framer) = feed_chunks(&chunks);

        prop_assert_eq!(&whole, &vec![message.clone()]);
        prop_assert_eq!(split, whole);
        prop_assert_eq!(framer.size(), 0);
        prop_assert_eq!(framer.state(), FrameState::Idle);
    }

    #[test]
    fn http_frame_one_byte_at_a_time((head, body) in http_message()) {
        let message = format!("{}{}", head, body);
        let chunks: Vec<&[u8]> = message.as_bytes().chunks(1).collect();
        let (frames, _) = feed_chunks(&chunks);
        prop_assert_eq!(frames, vec![message]);
    }

    #[test]
    fn plain_text_frame_is_independent_of_chunking(
        line in "[A-Za-z0-9,.!?]{0,80}",
        points in prop::collection::vec(0usize..96, 0..8),
    ) {
        let message = format!("{}\n", line);
        let chunks = split_at_points(message.as_bytes(), points);
        let (frames, framer) = feed_chunks(&chunks);

        prop_assert_eq!(frames, vec![line]);
        prop_assert_eq!(framer.size(), 0);
    }

    #[test]
    fn trailing_bytes_stay_buffered(
        (head, body) in http_message(),
        extra in "[a-z]{1,20}",
    ) {
        prop_assume!(!body.is_empty());
        let message = format!("{}{}{}", head, body, extra);
        let mut framer = FrameBuffer::default();

        let frame = framer.feed(message.as_bytes());
        prop_assert_eq!(frame, Some(format!("{}{}", head, body)));
        prop_assert_eq!(framer.size(), extra.len());
    }

    #[test]
    fn reset_discards_previous_state(
        garbage in "[ -~]{0,64}",
        (head, body) in http_message(),
    ) {
        let mut framer = FrameBuffer::default();
        framer.feed(garbage.as_bytes());
        framer.reset();

        let message = format!("{}{}", head, body);
        prop_assert_eq!(framer.feed(message.as_bytes()), Some(message));
    }

    #[test]
    fn framed_requests_always_parse((head, body) in http_message()) {
        let message = format!("{}{}", head, body);
        let request = MessageParser::default().parse(&message).unwrap();
        prop_assert_eq!(request.header("host"), Some("localhost"));
        let expected = if body.trim().is_empty() { 0 } else { body.len() };
        prop_assert_eq!(request.body().map_or(0, |b| b.size()), expected);
    }
}

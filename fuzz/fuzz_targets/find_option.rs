#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use meshdhcp6::wire::dhcpv6::{find_option, OptionCode, OptionReader, OPTION_HEADER_LEN};

#[derive(Arbitrary, Debug)]
struct Input {
    buffer: Vec<u8>,
    offset: usize,
    length: usize,
    code: u16,
}

fuzz_target!(|input: Input| {
    let code = OptionCode::from(input.code);
    let Some(at) = find_option(&input.buffer, input.offset, input.length, code) else {
        return;
    };

    // whatever was found lies wholly inside the window
    let end = input.offset + input.length;
    assert!(at >= input.offset);
    assert!(at + OPTION_HEADER_LEN <= end);

    let option = OptionReader::new(&input.buffer[at..end])
        .next()
        .expect("found option must be readable within the window");
    assert_eq!(option.kind, code);
});

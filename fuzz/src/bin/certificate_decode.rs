#[macro_use]
extern crate afl;
use gs15::Certificate;

fn main() {
    fuzz!(|data: &[u8]| {
        let _ = Certificate::from_bytes(data);
    });
}

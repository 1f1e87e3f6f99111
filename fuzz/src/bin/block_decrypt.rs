#[macro_use]
extern crate afl;
use gs15::{BlockCipher, SymmetricCipher};

fn main() {
    let cipher = BlockCipher::new(&[0x42u8; 32]).expect("Setup failed");

    fuzz!(|data: &[u8]| {
        if let Ok(plaintext) = cipher.decrypt(data) {
            let _ = cipher.encrypt(&plaintext);
        }
    });
}

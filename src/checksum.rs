//! CRC-8 used on every sensor response (Sensirion application note "CRC checksum", section 2).
//!
//! The polynomial is x^8 + x^5 + x^4 + 1, processed most significant bit first over the command byte
//! and every response byte. The register starts from the bit-reversed low nibble of the status
//! register, and the sensor transmits its checksum bit-reversed.

use crate::hw_def::STATUS_CRC_SEED_MASK;

use crc::{Crc, CRC_8_NRSC_5};

const CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

/// Initial CRC register value for the given status register contents
pub fn seed(status: u8) -> u8 {
    (status & STATUS_CRC_SEED_MASK).reverse_bits()
}

/// Compute the checksum of `bytes` (command byte first) with the register seeded from `status`
pub fn crc8(status: u8, bytes: &[u8]) -> u8 {
    let mut digest = CRC.digest_with_initial(seed(status));
    digest.update(bytes);
    digest.finalize()
}

/// Check a checksum byte exactly as it was clocked in from the sensor
pub fn verify(status: u8, bytes: &[u8], received: u8) -> bool {
    crc8(status, bytes) == received.reverse_bits()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Lookup table printed in the CRC application note
    const DATASHEET_TABLE: [u8; 256] = [
        0, 49, 98, 83, 196, 245, 166, 151, 185, 136, 219, 234, 125, 76, 31, 46,
        67, 114, 33, 16, 135, 182, 229, 212, 250, 203, 152, 169, 62, 15, 92, 109,
        134, 183, 228, 213, 66, 115, 32, 17, 63, 14, 93, 108, 251, 202, 153, 168,
        197, 244, 167, 150, 1, 48, 99, 82, 124, 77, 30, 47, 184, 137, 218, 235,
        61, 12, 95, 110, 249, 200, 155, 170, 132, 181, 230, 215, 64, 113, 34, 19,
        126, 79, 28, 45, 186, 139, 216, 233, 199, 246, 165, 148, 3, 50, 97, 80,
        187, 138, 217, 232, 127, 78, 29, 44, 2, 51, 96, 81, 198, 247, 164, 149,
        248, 201, 154, 171, 60, 13, 94, 111, 65, 112, 35, 18, 133, 180, 231, 214,
        122, 75, 24, 41, 190, 143, 220, 237, 195, 242, 161, 144, 7, 54, 101, 84,
        57, 8, 91, 106, 253, 204, 159, 174, 128, 177, 226, 211, 68, 117, 38, 23,
        252, 205, 158, 175, 56, 9, 90, 107, 69, 116, 39, 22, 129, 176, 227, 210,
        191, 142, 221, 236, 123, 74, 25, 40, 6, 55, 100, 85, 194, 243, 160, 145,
        71, 118, 37, 20, 131, 178, 225, 208, 254, 207, 156, 173, 58, 11, 88, 105,
        4, 53, 102, 87, 192, 241, 162, 147, 189, 140, 223, 238, 121, 72, 27, 42,
        193, 240, 163, 146, 5, 52, 103, 86, 120, 73, 26, 43, 188, 141, 222, 239,
        130, 179, 224, 209, 70, 119, 36, 21, 59, 10, 89, 104, 255, 206, 157, 172,
    ];

    fn reference(status: u8, bytes: &[u8]) -> u8 {
        bytes
            .iter()
            .fold(seed(status), |crc, byte| DATASHEET_TABLE[(byte ^ crc) as usize])
    }

    #[test]
    fn seed_is_reversed_low_nibble() {
        assert_eq!(seed(0x00), 0x00);
        assert_eq!(seed(0x01), 0x80);
        assert_eq!(seed(0x05), 0xA0);
        // upper nibble (low battery etc.) does not take part
        assert_eq!(seed(0x45), 0xA0);
        assert_eq!(seed(0x0F), 0xF0);
    }

    #[test]
    fn single_bytes_match_datasheet_table() {
        for byte in 0..=255u8 {
            assert_eq!(crc8(0, &[byte]), DATASHEET_TABLE[byte as usize], "byte {byte:#04x}");
        }
    }

    #[test]
    fn frames_match_datasheet_table() {
        let frames: [&[u8]; 5] = [
            &[0x07, 0x00],
            &[0x07, 0x45],
            &[0x03, 0x06, 0x40],
            &[0x05, 0x04, 0x31],
            &[0x05, 0xFF, 0xFF],
        ];
        for status in [0x00, 0x01, 0x04, 0x05, 0x07, 0x47] {
            for frame in frames {
                assert_eq!(crc8(status, frame), reference(status, frame));
            }
        }
    }

    #[test]
    fn every_single_bit_error_is_detected() {
        let frame = [0x03u8, 0x06, 0x40];
        let good = crc8(0x01, &frame);
        for byte in 0..frame.len() {
            for bit in 0..8 {
                let mut corrupted = frame;
                corrupted[byte] ^= 1 << bit;
                assert_ne!(crc8(0x01, &corrupted), good, "flip byte {byte} bit {bit}");
            }
        }
    }

    #[test]
    fn verify_expects_reversed_checksum_from_sensor() {
        let frame = [0x05u8, 0x04, 0x31];
        let computed = crc8(0, &frame);
        assert!(verify(0, &frame, computed.reverse_bits()));
        if computed != computed.reverse_bits() {
            assert!(!verify(0, &frame, computed));
        }
        assert!(!verify(0, &frame, computed.reverse_bits() ^ 0x01));
    }
}

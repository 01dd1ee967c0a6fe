use bech32::{Bech32m, Hrp};
use std::fmt;
use std::str::FromStr;

/// Kaspa network variants supported by the sync scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkVariant {
	Mainnet,
	Testnet,
}

impl NetworkVariant {
	/// Address prefix for this variant.
	pub fn address_prefix(&self) -> &'static str {
		match self {
			NetworkVariant::Mainnet => "kaspa",
			NetworkVariant::Testnet => "kaspatest",
		}
	}

	/// Public REST API base URL for this variant.
	pub fn rest_base_url(&self) -> &'static str {
		match self {
			NetworkVariant::Mainnet => "https://api.kaspa.org",
			NetworkVariant::Testnet => "https://api-tn10.kaspa.org",
		}
	}
}

impl fmt::Display for NetworkVariant {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			NetworkVariant::Mainnet => write!(f, "mainnet"),
			NetworkVariant::Testnet => write!(f, "testnet"),
		}
	}
}

impl FromStr for NetworkVariant {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"mainnet" => Ok(NetworkVariant::Mainnet),
			"testnet" => Ok(NetworkVariant::Testnet),
			other => Err(format!("unknown network variant: {}", other)),
		}
	}
}

/// Address-format descriptor: chain prefix plus network variant.
///
/// Resolved once per sync cycle from the job parameters and passed into the
/// classifier, instead of being re-derived from address strings for every
/// transaction.
#[derive(Debug, Clone, Copy)]
pub struct AddressFormat {
	network: NetworkVariant,
}

impl AddressFormat {
	pub fn new(network: NetworkVariant) -> Self {
		Self { network }
	}

	/// Decode a raw locking script (hex) into an address string.
	///
	/// Returns `None` for malformed hex and for scripts that match none of
	/// the standard templates; callers treat that as an unresolvable
	/// destination, not an error.
	pub fn script_to_address(&self, script_hex: &str) -> Option<String> {
		let script = hex::decode(script_hex).ok()?;
		let payload = extract_script_payload(&script)?;

		let hrp = Hrp::parse(self.network.address_prefix()).expect("Failed while bech32 parsing");
		bech32::encode::<Bech32m>(hrp, &payload).ok()
	}
}

/// Extract the address payload from a standard locking script.
///
/// Recognized templates:
/// - `OP_DATA_32 <schnorr pubkey> OP_CHECKSIG`
/// - `OP_DATA_33 <ecdsa pubkey> OP_CHECKSIG_ECDSA`
/// - `OP_BLAKE2B OP_DATA_32 <script hash> OP_EQUAL`
///
/// The payload keeps a leading version byte so the three kinds cannot alias
/// each other once encoded.
fn extract_script_payload(script: &[u8]) -> Option<Vec<u8>> {
	match script {
		[0x20, key @ .., 0xac] if key.len() == 32 => Some([&[0u8], key].concat()),
		[0x21, key @ .., 0xab] if key.len() == 33 => Some([&[1u8], key].concat()),
		[0xaa, 0x20, hash @ .., 0x87] if hash.len() == 32 => Some([&[8u8], hash].concat()),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn p2pk_script() -> String {
		format!("20{}ac", hex::encode([0x11u8; 32]))
	}

	#[test]
	fn decodes_schnorr_p2pk_script() {
		let format = AddressFormat::new(NetworkVariant::Mainnet);
		let address = format
			.script_to_address(&p2pk_script())
			.expect("Failed while decoding p2pk script");
		assert!(address.starts_with("kaspa1"));
	}

	#[test]
	fn decodes_ecdsa_and_p2sh_scripts_to_distinct_addresses() {
		let format = AddressFormat::new(NetworkVariant::Mainnet);

		let ecdsa = format!("21{}ab", hex::encode([0x22u8; 33]));
		let p2sh = format!("aa20{}87", hex::encode([0x33u8; 32]));

		let ecdsa_address = format
			.script_to_address(&ecdsa)
			.expect("Failed while decoding ecdsa script");
		let p2sh_address = format
			.script_to_address(&p2sh)
			.expect("Failed while decoding p2sh script");
		assert_ne!(ecdsa_address, p2sh_address);
	}

	#[test]
	fn network_variant_selects_the_prefix() {
		let mainnet = AddressFormat::new(NetworkVariant::Mainnet)
			.script_to_address(&p2pk_script())
			.expect("Failed while decoding p2pk script");
		let testnet = AddressFormat::new(NetworkVariant::Testnet)
			.script_to_address(&p2pk_script())
			.expect("Failed while decoding p2pk script");

		assert!(mainnet.starts_with("kaspa1"));
		assert!(testnet.starts_with("kaspatest1"));
	}

	#[test]
	fn rejects_non_standard_scripts() {
		let format = AddressFormat::new(NetworkVariant::Mainnet);

		// Truncated key
		assert_eq!(format.script_to_address("2011ac"), None);
		// Unknown opcode layout
		assert_eq!(format.script_to_address("6a0102"), None);
		// Not hex at all
		assert_eq!(format.script_to_address("zz"), None);
		// Empty script
		assert_eq!(format.script_to_address(""), None);
	}
}

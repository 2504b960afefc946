// src/decoders/spl_token_decoders/mint.rs

use anyhow::{bail, Result};
use solana_program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use spl_token_2022::state::Mint;

// --- STRUCTURE DE SORTIE PROPRE ---
// Ce que le filtre de sécurité a besoin de savoir sur un mint.
#[derive(Debug, Clone, PartialEq)]
pub struct MintAccount {
    pub address: Pubkey,
    /// Le programme propriétaire du compte (SPL Token ou Token-2022).
    pub owner_program: Pubkey,
    pub mint_authority: Option<Pubkey>,
    pub freeze_authority: Option<Pubkey>,
    pub is_initialized: bool,
    pub decimals: u8,
    pub supply: u64,
}

/// Décode l'état de base d'un mint (SPL Token ou Token-2022).
///
/// On lit uniquement les `Mint::LEN` premiers octets : les extensions Token-2022
/// viennent après et ne changent pas l'état de base. `unpack_from_slice` ne
/// vérifie pas le drapeau d'initialisation, ce qui permet de le remonter tel quel.
pub fn decode_mint(address: &Pubkey, owner_program: &Pubkey, data: &[u8]) -> Result<MintAccount> {
    if data.len() < Mint::LEN {
        bail!("Données du mint {} trop courtes ({} octets)", address, data.len());
    }
    let base = Mint::unpack_from_slice(&data[..Mint::LEN])?;

    Ok(MintAccount {
        address: *address,
        owner_program: *owner_program,
        mint_authority: base.mint_authority.into(),
        freeze_authority: base.freeze_authority.into(),
        is_initialized: base.is_initialized,
        decimals: base.decimals,
        supply: base.supply,
    })
}

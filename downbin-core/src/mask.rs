//! # Mask — contêiner de bits de largura fixa
//!
//! Valor puro. Toda operação que recebe índice de bit ou padrão bruto
//! é verificada contra `width`; violações são erros de contrato.

use std::fmt;
use serde::{Deserialize, Serialize};
use crate::error::{FsError, FsResult};

/// Largura máxima suportada
pub const MAX_WIDTH: u32 = 32;

/// Máscara de bits com largura explícita (≤ 32)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawMask")]
pub struct Mask {
    value: u32,
    width: u32,
}

/// Forma serializada, validada por `Mask::from_bits`
#[derive(Deserialize)]
struct RawMask {
    value: u32,
    width: u32,
}

impl TryFrom<RawMask> for Mask {
    type Error = FsError;

    fn try_from(raw: RawMask) -> FsResult<Self> {
        Mask::from_bits(raw.width, raw.value)
    }
}

/// Padrão com os `width` bits inferiores em 1
#[inline]
const fn limit(width: u32) -> u32 {
    if width >= 32 { u32::MAX } else { (1u32 << width) - 1 }
}

impl Mask {
    /// Máscara vazia
    pub fn new(width: u32) -> FsResult<Self> {
        if width > MAX_WIDTH {
            return Err(FsError::WidthTooLarge(width));
        }
        Ok(Self { value: 0, width })
    }

    /// Máscara com todos os bits em 1
    pub fn full(width: u32) -> FsResult<Self> {
        let mut mask = Self::new(width)?;
        mask.set_all();
        Ok(mask)
    }

    /// Máscara a partir de padrão bruto
    pub fn from_bits(width: u32, value: u32) -> FsResult<Self> {
        let mut mask = Self::new(width)?;
        mask.set_bits(value)?;
        Ok(mask)
    }

    /// Máscara com um único bit
    pub fn with_bit(width: u32, bit: u32) -> FsResult<Self> {
        let mut mask = Self::new(width)?;
        mask.set_bit(bit)?;
        Ok(mask)
    }

    /// Faixa contígua `[start, start + len)`
    pub fn range(width: u32, start: u32, len: u32) -> FsResult<Self> {
        let mut mask = Self::new(width)?;
        if start.checked_add(len).is_none_or(|end| end > width) {
            return Err(FsError::BitOutOfRange { bit: start.saturating_add(len), width });
        }
        // start == width só é aceito com len == 0
        mask.value = limit(len).checked_shl(start).unwrap_or(0);
        Ok(mask)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.value
    }

    fn check_bit(&self, bit: u32) -> FsResult<()> {
        if bit >= self.width {
            return Err(FsError::BitOutOfRange { bit, width: self.width });
        }
        Ok(())
    }

    fn check_pattern(&self, pattern: u32) -> FsResult<()> {
        if pattern & !limit(self.width) != 0 {
            return Err(FsError::PatternOutOfRange { pattern, width: self.width });
        }
        Ok(())
    }

    fn check_width(&self, other: &Mask) -> FsResult<()> {
        if self.width != other.width {
            return Err(FsError::WidthMismatch { expected: self.width, found: other.width });
        }
        Ok(())
    }

    pub fn set_bit(&mut self, bit: u32) -> FsResult<()> {
        self.check_bit(bit)?;
        self.value |= 1 << bit;
        Ok(())
    }

    pub fn clear_bit(&mut self, bit: u32) -> FsResult<()> {
        self.check_bit(bit)?;
        self.value &= !(1 << bit);
        Ok(())
    }

    pub fn set_bits(&mut self, pattern: u32) -> FsResult<()> {
        self.check_pattern(pattern)?;
        self.value |= pattern;
        Ok(())
    }

    pub fn clear_bits(&mut self, pattern: u32) -> FsResult<()> {
        self.check_pattern(pattern)?;
        self.value &= !pattern;
        Ok(())
    }

    pub fn set_all(&mut self) {
        self.value = limit(self.width);
    }

    pub fn clear_all(&mut self) {
        self.value = 0;
    }

    pub fn is_set(&self, bit: u32) -> FsResult<bool> {
        self.check_bit(bit)?;
        Ok(self.value & (1 << bit) != 0)
    }

    pub fn is_full(&self) -> bool {
        self.value == limit(self.width)
    }

    pub fn is_empty(&self) -> bool {
        self.value == 0
    }

    pub fn num_set_bits(&self) -> u32 {
        self.value.count_ones()
    }

    pub fn num_unset_bits(&self) -> u32 {
        self.width - self.num_set_bits()
    }

    /// `self = !mask`, opcionalmente restrito a `reference`
    pub fn set_inverted_mask(&mut self, mask: &Mask, reference: Option<&Mask>) -> FsResult<()> {
        self.check_width(mask)?;
        let mut value = !mask.value & limit(self.width);
        if let Some(reference) = reference {
            self.check_width(reference)?;
            value &= reference.value;
        }
        self.value = value;
        Ok(())
    }

    /// Complemento dentro da largura
    pub fn inverted(&self) -> Mask {
        Mask { value: !self.value & limit(self.width), width: self.width }
    }

    pub fn and(&self, other: &Mask) -> FsResult<Mask> {
        self.check_width(other)?;
        Ok(Mask { value: self.value & other.value, width: self.width })
    }

    pub fn or(&self, other: &Mask) -> FsResult<Mask> {
        self.check_width(other)?;
        Ok(Mask { value: self.value | other.value, width: self.width })
    }

    /// `self & !other`
    pub fn and_not(&self, other: &Mask) -> FsResult<Mask> {
        self.check_width(other)?;
        Ok(Mask { value: self.value & !other.value, width: self.width })
    }

    /// Todos os bits de `self` estão em `other` (larguras diferentes nunca são subconjunto)
    pub fn is_subset_of(&self, other: &Mask) -> bool {
        self.width == other.width && self.value & !other.value == 0
    }

    /// Contém todos os bits de `other`
    pub fn contains(&self, other: &Mask) -> bool {
        other.is_subset_of(self)
    }

    /// Menor bit em 1
    pub fn lowest_set(&self) -> Option<u32> {
        if self.value == 0 { None } else { Some(self.value.trailing_zeros()) }
    }

    /// Itera os índices em 1, em ordem crescente
    pub fn iter_set(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.width).filter(move |bit| self.value & (1 << bit) != 0)
    }

    /// Extrai `len` bits a partir de `start` como nova máscara
    pub fn extract(&self, start: u32, len: u32) -> FsResult<Mask> {
        let range = Mask::range(self.width, start, len)?;
        let value = (self.value & range.value).checked_shr(start).unwrap_or(0);
        Ok(Mask { value, width: len })
    }
}

impl fmt::Display for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.width == 0 {
            return f.write_str("0b");
        }
        write!(f, "0b{:0width$b}", self.value, width = self.width as usize)
    }
}

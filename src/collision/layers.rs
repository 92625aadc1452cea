use bitflags::bitflags;
use tracing::debug;

use crate::error::HandsError;
use crate::Result;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Number of collision layers available to the solver
pub const LAYER_COUNT: u8 = 32;

/// First layer index that can be claimed automatically; lower slots are
/// reserved for the host
pub const FIRST_USER_LAYER: u8 = 8;

bitflags! {
    /// A bit mask over the 32 collision layers
    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
    pub struct LayerMask: u32 {
        /// No layers
        const NONE = 0x00000000;

        /// The default layer
        const DEFAULT = 0x00000001;

        /// All layers
        const ALL = 0xFFFFFFFF;
    }
}

impl LayerMask {
    /// Mask containing a single layer
    #[inline]
    pub fn layer(index: u8) -> Self {
        debug_assert!(index < LAYER_COUNT);
        Self::from_bits_retain(1u32 << index)
    }

    /// Whether the mask contains the given layer
    #[inline]
    pub fn has_layer(&self, index: u8) -> bool {
        index < LAYER_COUNT && self.bits() & (1u32 << index) != 0
    }
}

/// The solver's pairwise layer table: a name per slot and a symmetric
/// ignore matrix
#[derive(Debug, Clone)]
pub struct LayerMatrix {
    names: Vec<Option<String>>,
    ignore: [LayerMask; LAYER_COUNT as usize],
}

impl Default for LayerMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerMatrix {
    /// Creates a table with the host's builtin layers named and every pair colliding
    pub fn new() -> Self {
        let mut names = vec![None; LAYER_COUNT as usize];
        names[0] = Some("Default".to_string());
        names[1] = Some("TransparentFX".to_string());
        names[2] = Some("Ignore Raycast".to_string());
        names[4] = Some("Water".to_string());
        names[5] = Some("UI".to_string());

        Self {
            names,
            ignore: [LayerMask::NONE; LAYER_COUNT as usize],
        }
    }

    /// Returns the name of a layer, if the slot is in use
    pub fn name(&self, layer: u8) -> Option<&str> {
        self.names.get(layer as usize).and_then(|n| n.as_deref())
    }

    /// Names a layer slot, marking it as used
    pub fn set_name(&mut self, layer: u8, name: impl Into<String>) -> Result<()> {
        check_layer(layer)?;
        self.names[layer as usize] = Some(name.into());
        Ok(())
    }

    /// Whether a slot is unnamed and can be claimed
    pub fn is_free(&self, layer: u8) -> bool {
        layer < LAYER_COUNT && self.names[layer as usize].is_none()
    }

    /// Whether collisions between two layers are ignored
    pub fn is_ignored(&self, a: u8, b: u8) -> bool {
        a < LAYER_COUNT && self.ignore[a as usize].has_layer(b)
    }

    /// Whether two layers generate contacts
    pub fn collides(&self, a: u8, b: u8) -> bool {
        !self.is_ignored(a, b)
    }

    /// Sets whether two layers ignore each other (symmetric)
    pub fn set_ignore(&mut self, a: u8, b: u8, ignore: bool) {
        if a >= LAYER_COUNT || b >= LAYER_COUNT {
            return;
        }
        self.ignore[a as usize].set(LayerMask::layer(b), ignore);
        self.ignore[b as usize].set(LayerMask::layer(a), ignore);
    }

    /// The ignore row of a layer
    pub fn row(&self, layer: u8) -> LayerMask {
        self.ignore.get(layer as usize).copied().unwrap_or(LayerMask::ALL)
    }

    /// Mask of every layer that collides with the given one
    pub fn collision_mask(&self, layer: u8) -> LayerMask {
        !self.row(layer)
    }
}

fn check_layer(layer: u8) -> Result<()> {
    if layer >= LAYER_COUNT {
        return Err(HandsError::InvalidLayer(layer));
    }
    Ok(())
}

/// Layer indices resolved by [`LayerConfig::generate_layers`]
#[derive(Debug, Clone, PartialEq)]
pub struct LayerAssignment {
    /// Layer the hands live on while active
    pub hands: u8,

    /// Layer the hands move to while resetting; collides with nothing
    pub hands_reset: u8,

    /// Layers the hands touch and grasp
    pub interactable: Vec<u8>,

    /// Layers the hands pass through
    pub no_contact: Vec<u8>,

    /// Union of the interactable layers, used for proximity queries
    pub hover_mask: LayerMask,

    /// Union of the interactable layers, used for contact queries
    pub contact_mask: LayerMask,

    /// Ignore row of the template layer as it was before any rules were applied
    template_row: LayerMask,
}

/// Collision domain configuration for the hands.
///
/// Built once at start-up and passed by reference to whatever needs the
/// layer indices.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct LayerConfig {
    /// Template layer whose ignore settings the hands inherit
    pub default_layer: u8,

    /// Layers the hands should touch. Empty means the template layer.
    pub interactable_layers: Vec<u8>,

    /// Layers the hands should pass through. Empty means one gets allocated.
    pub no_contact_layers: Vec<u8>,

    /// Manual hand layer; `None` allocates automatically
    pub hands_layer: Option<u8>,

    /// Manual hand reset layer; `None` allocates automatically
    pub hands_reset_layer: Option<u8>,

    /// Whether the two hands collide with one another
    pub inter_hand_collisions: bool,

    #[cfg_attr(feature = "serialize", serde(skip))]
    assignment: Option<LayerAssignment>,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            default_layer: 0,
            interactable_layers: vec![0],
            no_contact_layers: Vec::new(),
            hands_layer: None,
            hands_reset_layer: None,
            inter_hand_collisions: false,
            assignment: None,
        }
    }
}

impl LayerConfig {
    /// Whether layers have been generated successfully
    pub fn is_generated(&self) -> bool {
        self.assignment.is_some()
    }

    /// The resolved layers, once generated
    pub fn assignment(&self) -> Option<&LayerAssignment> {
        self.assignment.as_ref()
    }

    pub fn with_default_layer(mut self, layer: u8) -> Self {
        self.default_layer = layer;
        self
    }

    pub fn with_interactable_layers(mut self, layers: Vec<u8>) -> Self {
        self.interactable_layers = layers;
        self
    }

    pub fn with_no_contact_layers(mut self, layers: Vec<u8>) -> Self {
        self.no_contact_layers = layers;
        self
    }

    pub fn with_hands_layer(mut self, layer: Option<u8>) -> Self {
        self.hands_layer = layer;
        self
    }

    pub fn with_hands_reset_layer(mut self, layer: Option<u8>) -> Self {
        self.hands_reset_layer = layer;
        self
    }

    pub fn with_inter_hand_collisions(mut self, enabled: bool) -> Self {
        self.inter_hand_collisions = enabled;
        self
    }

    /// Resolves the hand, reset and no-contact layers, claiming free slots in
    /// `matrix` for whatever was left automatic.
    ///
    /// Returns [`HandsError::LayerExhausted`] when there are not enough free
    /// slots; the hands then need manual layer setup. Calling again after a
    /// successful run does nothing.
    pub fn generate_layers(&mut self, matrix: &mut LayerMatrix) -> Result<&LayerAssignment> {
        if self.assignment.is_some() {
            return self.assignment.as_ref().ok_or(HandsError::LayersNotGenerated);
        }

        check_layer(self.default_layer)?;
        for &layer in self.interactable_layers.iter().chain(self.no_contact_layers.iter()) {
            check_layer(layer)?;
        }

        let default = self.default_layer;
        let manual = |layer: Option<u8>| -> Result<Option<u8>> {
            match layer {
                Some(l) => {
                    check_layer(l)?;
                    Ok(if l == default { None } else { Some(l) })
                }
                None => Ok(None),
            }
        };

        let mut hands = manual(self.hands_layer)?;
        let mut hands_reset = manual(self.hands_reset_layer)?;
        let mut no_contact: Vec<u8> = self
            .no_contact_layers
            .iter()
            .copied()
            .filter(|&l| l != default)
            .collect();
        let mut interactable = self.interactable_layers.clone();
        if interactable.is_empty() {
            interactable.push(default);
        }

        let mut allocated_no_contact = None;
        for layer in FIRST_USER_LAYER..LAYER_COUNT {
            let in_use = Some(layer) == hands
                || Some(layer) == hands_reset
                || no_contact.contains(&layer)
                || interactable.contains(&layer);
            if in_use || !matrix.is_free(layer) {
                continue;
            }

            if no_contact.is_empty() {
                no_contact.push(layer);
                allocated_no_contact = Some(layer);
                continue;
            }
            if hands.is_none() {
                hands = Some(layer);
                continue;
            } else if hands_reset.is_none() {
                hands_reset = Some(layer);
                break;
            }
        }

        let (hands, hands_reset) = match (hands, hands_reset) {
            (Some(h), Some(r)) => (h, r),
            _ => {
                return Err(HandsError::LayerExhausted {
                    needed: 2 + usize::from(self.no_contact_layers.is_empty()),
                });
            }
        };

        if matrix.is_free(hands) {
            matrix.set_name(hands, "Hands")?;
        }
        if matrix.is_free(hands_reset) {
            matrix.set_name(hands_reset, "HandsReset")?;
        }
        if let Some(layer) = allocated_no_contact {
            matrix.set_name(layer, "NoContact")?;
        }

        let mask = interactable
            .iter()
            .fold(LayerMask::NONE, |mask, &l| mask | LayerMask::layer(l));

        debug!(hands, hands_reset, ?no_contact, ?interactable, "generated hand layers");

        let assignment = self.assignment.insert(LayerAssignment {
            hands,
            hands_reset,
            interactable,
            no_contact,
            hover_mask: mask,
            contact_mask: mask,
            template_row: matrix.row(default),
        });
        Ok(&*assignment)
    }

    /// Programs the pairwise collision rules for the generated layers.
    ///
    /// Idempotent: the template row is the one captured at generation time,
    /// so applying the rules again produces the same matrix.
    pub fn apply_collision_rules(&self, matrix: &mut LayerMatrix) -> Result<()> {
        let layers = self.assignment.as_ref().ok_or(HandsError::LayersNotGenerated)?;

        for i in 0..LAYER_COUNT {
            let ignore = layers.template_row.has_layer(i);
            matrix.set_ignore(layers.hands, i, ignore);
            for &nc in &layers.no_contact {
                matrix.set_ignore(nc, i, ignore);
            }
        }

        // The reset layer ignores everything, itself included
        for i in 0..LAYER_COUNT {
            matrix.set_ignore(layers.hands_reset, i, true);
        }

        for &layer in &layers.interactable {
            matrix.set_ignore(layer, layers.hands, false);
        }

        for &layer in &layers.no_contact {
            matrix.set_ignore(layer, layers.hands, true);
        }

        matrix.set_ignore(layers.hands, layers.hands, !self.inter_hand_collisions);

        Ok(())
    }
}

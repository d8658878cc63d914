use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// One of the two competing communities. Every user holds one score per community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Community {
    /// Itto Mains.
    Itto,
    /// Shenhe Mains.
    Shenhe,
}

impl Community {
    /// Both communities in display order.
    pub const ALL: [Community; 2] = [Community::Itto, Community::Shenhe];

    /// Name of the score field holding this community's points.
    pub fn field(self) -> &'static str {
        match self {
            Community::Itto => "itto",
            Community::Shenhe => "shenhe",
        }
    }

    /// The opposing community.
    pub fn other(self) -> Self {
        match self {
            Community::Itto => Community::Shenhe,
            Community::Shenhe => Community::Itto,
        }
    }

    /// Title-cased name used in leaderboard headers.
    pub fn title(self) -> &'static str {
        match self {
            Community::Itto => "Itto",
            Community::Shenhe => "Shenhe",
        }
    }

    /// Small-caps label shown on score cards.
    pub fn label(self) -> &'static str {
        match self {
            Community::Itto => "ɪᴛᴛᴏ",
            Community::Shenhe => "sʜᴇɴʜᴇ",
        }
    }

    /// Pick one of the two communities with equal probability.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random_bool(0.5) {
            Community::Itto
        } else {
            Community::Shenhe
        }
    }
}

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn other_is_an_involution() {
        for community in Community::ALL {
            assert_ne!(community.other(), community);
            assert_eq!(community.other().other(), community);
        }
    }

    #[test]
    fn random_draw_reaches_both_communities() {
        let mut rng = StdRng::seed_from_u64(7);
        let draws: Vec<_> = (0..64).map(|_| Community::random(&mut rng)).collect();
        assert!(draws.contains(&Community::Itto));
        assert!(draws.contains(&Community::Shenhe));
    }
}

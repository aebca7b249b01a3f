//! Health, attack and elemental damage resolution.

use keybound_core::Element;
use serde::Deserialize;

/// Combat statistics shared by pawns and enemies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Combatant {
    health: i32,
    max_health: i32,
    attack: u32,
    element: Element,
}

impl Combatant {
    /// Creates a combatant at full health.
    #[must_use]
    pub const fn new(max_health: i32, attack: u32, element: Element) -> Self {
        Self {
            health: max_health,
            max_health,
            attack,
            element,
        }
    }

    /// Current health. Zero or below means defeated.
    #[must_use]
    pub const fn health(&self) -> i32 {
        self.health
    }

    /// Health ceiling used when healing.
    #[must_use]
    pub const fn max_health(&self) -> i32 {
        self.max_health
    }

    /// Base attack before elemental modifiers.
    #[must_use]
    pub const fn attack(&self) -> u32 {
        self.attack
    }

    /// Elemental affinity.
    #[must_use]
    pub const fn element(&self) -> Element {
        self.element
    }

    /// Reports whether the combatant still stands.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Subtracts damage and reports whether the combatant is still alive.
    pub fn take_damage(&mut self, damage: u32) -> bool {
        let damage = i32::try_from(damage).unwrap_or(i32::MAX);
        self.health = self.health.saturating_sub(damage);
        self.is_alive()
    }

    /// Restores up to `amount` health without exceeding the maximum.
    ///
    /// Returns the health actually restored.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let missing = self.max_health.saturating_sub(self.health).max(0);
        let restored = i32::try_from(amount).unwrap_or(i32::MAX).min(missing);
        self.health += restored;
        u32::try_from(restored).unwrap_or(0)
    }
}

/// Stats template for a pawn or enemy, as listed in a roster.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct EntitySpec {
    /// Display name, unique across the roster.
    pub name: String,
    /// Starting and maximum health.
    pub health: i32,
    /// Base attack.
    pub attack: u32,
    /// Elemental affinity.
    #[serde(default)]
    pub element: Element,
}

impl EntitySpec {
    /// Creates a roster entry.
    #[must_use]
    pub fn new(name: impl Into<String>, health: i32, attack: u32, element: Element) -> Self {
        Self {
            name: name.into(),
            health,
            attack,
            element,
        }
    }

    pub(crate) const fn combatant(&self) -> Combatant {
        Combatant::new(self.health, self.attack, self.element)
    }
}

/// Result of a single strike.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttackOutcome {
    /// Damage applied to the defender.
    pub damage: u32,
    /// Defender health after the strike.
    pub remaining_health: i32,
    /// Whether the defender survived.
    pub survived: bool,
}

/// Damage an attacker deals to a defender: `max(attack + modifier, 0)`.
#[must_use]
pub fn damage_against(attacker: &Combatant, defender: &Combatant) -> u32 {
    let modifier = attacker.element().modifier_against(defender.element());
    let raw = i64::from(attacker.attack()) + i64::from(modifier);
    u32::try_from(raw.max(0)).unwrap_or(u32::MAX)
}

/// Applies one strike from `attacker` to `defender`.
pub fn resolve_attack(attacker: &Combatant, defender: &mut Combatant) -> AttackOutcome {
    let damage = damage_against(attacker, defender);
    let survived = defender.take_damage(damage);
    AttackOutcome {
        damage,
        remaining_health: defender.health(),
        survived,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_strike_deals_base_attack() {
        let attacker = Combatant::new(100, 20, Element::Neutral);
        let mut defender = Combatant::new(100, 20, Element::Fire);

        let outcome = resolve_attack(&attacker, &mut defender);
        assert_eq!(outcome.damage, 20);
        assert_eq!(outcome.remaining_health, 80);
        assert!(outcome.survived);
    }

    #[test]
    fn elemental_advantage_adjusts_damage() {
        let fire = Combatant::new(100, 20, Element::Fire);
        let grass = Combatant::new(100, 20, Element::Grass);
        assert_eq!(damage_against(&fire, &grass), 21);
        assert_eq!(damage_against(&grass, &fire), 19);
    }

    #[test]
    fn damage_never_goes_negative() {
        let weak = Combatant::new(10, 0, Element::Grass);
        let mut strong = Combatant::new(10, 0, Element::Fire);
        let outcome = resolve_attack(&weak, &mut strong);
        assert_eq!(outcome.damage, 0);
        assert_eq!(strong.health(), 10);
    }

    #[test]
    fn lethal_strike_reports_defeat() {
        let attacker = Combatant::new(100, 30, Element::Neutral);
        let mut defender = Combatant::new(25, 5, Element::Neutral);
        let outcome = resolve_attack(&attacker, &mut defender);
        assert!(!outcome.survived);
        assert_eq!(outcome.remaining_health, -5);
        assert!(!defender.is_alive());
    }

    #[test]
    fn healing_is_capped_at_maximum() {
        let mut pawn = Combatant::new(100, 20, Element::Neutral);
        assert!(pawn.take_damage(15));
        assert_eq!(pawn.heal(10), 10);
        assert_eq!(pawn.heal(10), 5);
        assert_eq!(pawn.health(), 100);
        assert_eq!(pawn.heal(10), 0);
    }
}

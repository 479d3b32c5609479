//! Guild food logistics: choosing which rations an expedition consumes.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::constants::{
    DIET_FOOD_PRICE, DIET_FOOD_RATIONS, FOOD_REQUIRED_BY_REWARD_INDEX, REWARD_INDEX_MAX,
    SOUP_PRICE, SOUP_RATIONS, TREAT_PRICE, TREAT_RATIONS,
};

/// Food tiers stored by a guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodType {
    Treat,
    Meat,
    Salad,
    Soup,
}

impl FoodType {
    #[must_use]
    pub const fn rations(self) -> u32 {
        match self {
            Self::Treat => TREAT_RATIONS,
            Self::Meat | Self::Salad => DIET_FOOD_RATIONS,
            Self::Soup => SOUP_RATIONS,
        }
    }

    #[must_use]
    pub const fn unit_price(self) -> u32 {
        match self {
            Self::Treat => TREAT_PRICE,
            Self::Meat | Self::Salad => DIET_FOOD_PRICE,
            Self::Soup => SOUP_PRICE,
        }
    }
}

/// What a pet species eats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetDiet {
    Carnivorous,
    Herbivorous,
    Omnivorous,
}

/// Current guild stock for each tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildFoodStock {
    pub treats: u32,
    pub meat: u32,
    pub salad: u32,
    pub soup: u32,
}

impl GuildFoodStock {
    #[must_use]
    pub const fn count(&self, food: FoodType) -> u32 {
        match food {
            FoodType::Treat => self.treats,
            FoodType::Meat => self.meat,
            FoodType::Salad => self.salad,
            FoodType::Soup => self.soup,
        }
    }

    /// The middle tier a pet with this diet eats.
    #[must_use]
    pub const fn diet_food(&self, diet: PetDiet) -> FoodType {
        match diet {
            PetDiet::Carnivorous => FoodType::Meat,
            PetDiet::Herbivorous => FoodType::Salad,
            PetDiet::Omnivorous => {
                if self.meat > self.salad {
                    FoodType::Meat
                } else {
                    FoodType::Salad
                }
            }
        }
    }

    /// Decrement every tier named by the plan, saturating at zero.
    pub fn apply(&mut self, plan: &FoodConsumptionPlan) {
        for line in &plan.consumption {
            let slot = match line.food_type {
                FoodType::Treat => &mut self.treats,
                FoodType::Meat => &mut self.meat,
                FoodType::Salad => &mut self.salad,
                FoodType::Soup => &mut self.soup,
            };
            *slot = slot.saturating_sub(line.items_to_consume);
        }
    }
}

/// One tier's contribution to a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodConsumption {
    pub food_type: FoodType,
    pub items_to_consume: u32,
    pub rations_provided: u32,
}

/// Result of the logistics optimizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodConsumptionPlan {
    pub total_rations: u32,
    pub required_rations: u32,
    pub consumption: SmallVec<[FoodConsumption; 3]>,
}

impl FoodConsumptionPlan {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.consumption.is_empty()
    }

    #[must_use]
    pub const fn deficit(&self) -> u32 {
        self.required_rations.saturating_sub(self.total_rations)
    }

    #[must_use]
    pub fn cost(&self) -> u32 {
        self.consumption
            .iter()
            .fold(0_u32, |total, line| {
                let line_cost = line
                    .items_to_consume
                    .saturating_mul(line.food_type.unit_price());
                total.saturating_add(line_cost)
            })
    }

    #[must_use]
    pub fn items_of(&self, food: FoodType) -> u32 {
        self.consumption
            .iter()
            .filter(|line| line.food_type == food)
            .map(|line| line.items_to_consume)
            .sum()
    }

    fn from_counts(required: u32, diet_food: FoodType, treats: u32, diet: u32, soup: u32) -> Self {
        let mut consumption: SmallVec<[FoodConsumption; 3]> = SmallVec::new();
        for (food_type, items) in [
            (FoodType::Treat, treats),
            (diet_food, diet),
            (FoodType::Soup, soup),
        ] {
            if items > 0 {
                consumption.push(FoodConsumption {
                    food_type,
                    items_to_consume: items,
                    rations_provided: items.saturating_mul(food_type.rations()),
                });
            }
        }
        let total_rations = consumption
            .iter()
            .fold(0_u32, |total, line| total.saturating_add(line.rations_provided));
        Self {
            total_rations,
            required_rations: required,
            consumption,
        }
    }
}

/// Rations needed for an expedition of the given reward index.
#[must_use]
pub fn food_required(reward_index: u8) -> u32 {
    FOOD_REQUIRED_BY_REWARD_INDEX[usize::from(reward_index.min(REWARD_INDEX_MAX))]
}

/// Choose the combination meeting `required` with the least excess, then the
/// lowest cost. When stock falls short everything available is consumed.
///
/// Only one diet tier is ever drawn on. An omnivore's shortfall leaves the
/// less stocked of meat and salad untouched.
#[must_use]
pub fn plan_food_consumption(
    required: u32,
    stock: &GuildFoodStock,
    diet: PetDiet,
) -> FoodConsumptionPlan {
    if required == 0 {
        return FoodConsumptionPlan::empty();
    }

    let diet_food = stock.diet_food(diet);
    let treats_available = stock.treats;
    let diet_available = stock.count(diet_food);
    let soup_available = stock.soup;

    let max_rations = treats_available
        .saturating_mul(TREAT_RATIONS)
        .saturating_add(diet_available.saturating_mul(diet_food.rations()))
        .saturating_add(soup_available.saturating_mul(SOUP_RATIONS));
    if max_rations < required {
        let plan = FoodConsumptionPlan::from_counts(
            required,
            diet_food,
            treats_available,
            diet_available,
            soup_available,
        );
        log::debug!(
            "food stock short: {} of {} rations, consuming everything",
            plan.total_rations,
            required
        );
        return plan;
    }

    let treat_cap = treats_available.min(required);
    let diet_cap = diet_available.min(required.div_ceil(diet_food.rations()));
    let soup_cap = soup_available.min(required.div_ceil(SOUP_RATIONS));

    let mut best: Option<((u32, u32), (u32, u32, u32))> = None;
    for t in 0..=treat_cap {
        for d in 0..=diet_cap {
            for s in 0..=soup_cap {
                let total = t
                    .saturating_mul(TREAT_RATIONS)
                    .saturating_add(d.saturating_mul(diet_food.rations()))
                    .saturating_add(s.saturating_mul(SOUP_RATIONS));
                if total < required {
                    continue;
                }
                let cost = t
                    .saturating_mul(TREAT_PRICE)
                    .saturating_add(d.saturating_mul(diet_food.unit_price()))
                    .saturating_add(s.saturating_mul(SOUP_PRICE));
                let key = (total - required, cost);
                if best.is_none_or(|(current, _)| key < current) {
                    best = Some((key, (t, d, s)));
                }
            }
        }
    }

    let (t, d, s) = best.map_or(
        (treats_available, diet_available, soup_available),
        |(_, counts)| counts,
    );
    let plan = FoodConsumptionPlan::from_counts(required, diet_food, t, d, s);
    log::debug!(
        "food plan: {} rations for {} required, cost {}",
        plan.total_rations,
        required,
        plan.cost()
    );
    plan
}

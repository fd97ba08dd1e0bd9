use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContestStatus {
    Draft,
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

impl ContestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContestStatus::Draft => "DRAFT",
            ContestStatus::Upcoming => "UPCOMING",
            ContestStatus::Ongoing => "ONGOING",
            ContestStatus::Completed => "COMPLETED",
            ContestStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(tag: &str) -> Option<ContestStatus> {
        match tag {
            "DRAFT" => Some(ContestStatus::Draft),
            "UPCOMING" => Some(ContestStatus::Upcoming),
            "ONGOING" => Some(ContestStatus::Ongoing),
            "COMPLETED" => Some(ContestStatus::Completed),
            "CANCELLED" => Some(ContestStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "PENDING",
            ApprovalStatus::Approved => "APPROVED",
            ApprovalStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(tag: &str) -> Option<ApprovalStatus> {
        match tag {
            "PENDING" => Some(ApprovalStatus::Pending),
            "APPROVED" => Some(ApprovalStatus::Approved),
            "REJECTED" => Some(ApprovalStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DrawMode {
    Random,
    Manual,
    Weighted,
}

impl DrawMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DrawMode::Random => "RANDOM",
            DrawMode::Manual => "MANUAL",
            DrawMode::Weighted => "WEIGHTED",
        }
    }

    pub fn parse(tag: &str) -> Option<DrawMode> {
        match tag {
            "RANDOM" => Some(DrawMode::Random),
            "MANUAL" => Some(DrawMode::Manual),
            "WEIGHTED" => Some(DrawMode::Weighted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrizeStatus {
    Pending,
    Claimed,
    Shipped,
}

impl PrizeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PrizeStatus::Pending => "PENDING",
            PrizeStatus::Claimed => "CLAIMED",
            PrizeStatus::Shipped => "SHIPPED",
        }
    }

    pub fn parse(tag: &str) -> Option<PrizeStatus> {
        match tag {
            "PENDING" => Some(PrizeStatus::Pending),
            "CLAIMED" => Some(PrizeStatus::Claimed),
            "SHIPPED" => Some(PrizeStatus::Shipped),
            _ => None,
        }
    }

    // PENDING < CLAIMED < SHIPPED; fulfilment only moves forward
    pub fn rank(self) -> u8 {
        match self {
            PrizeStatus::Pending => 0,
            PrizeStatus::Claimed => 1,
            PrizeStatus::Shipped => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contest {
    pub id: i64,
    pub name: String,
    pub theme: String,
    pub description: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: ContestStatus,
    pub approval_status: ApprovalStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContest {
    pub name: String,
    pub theme: String,
    pub description: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: ContestStatus,
    pub approval_status: ApprovalStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prize {
    pub id: i64,
    pub contest_id: i64,
    pub name: String,
    pub quantity: i64,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: i64,
    pub contest_id: i64,
    pub name: String,
    pub contact: String,
    pub validated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draw {
    pub id: i64,
    pub contest_id: i64,
    pub draw_mode: DrawMode,
    pub executed_by: String,
    pub executed_at: String,
    pub total_winners: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDraw {
    pub contest_id: i64,
    pub draw_mode: DrawMode,
    pub executed_by: String,
    pub executed_at: String,
    pub total_winners: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Winner {
    pub id: i64,
    pub draw_id: i64,
    pub participant_id: i64,
    pub prize_id: Option<i64>,
    pub prize_status: PrizeStatus,
    pub notified: bool,
    pub notified_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWinner {
    pub draw_id: i64,
    pub participant_id: i64,
    pub prize_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WinnerPatch {
    pub prize_status: Option<PrizeStatus>,
    pub notified: Option<bool>,
    pub notified_at: Option<String>,
}

// Winner row joined with participant and prize info for display
#[derive(Debug, Clone, Serialize)]
pub struct WinnerDetail {
    pub winner: Winner,
    pub participant_name: String,
    pub participant_contact: String,
    pub prize_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScratchCardPrize {
    pub id: i64,
    pub contest_id: i64,
    pub name: String,
    pub probability: f64,
}

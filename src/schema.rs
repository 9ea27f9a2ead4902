//! Column names of the two source datasets.

pub const DATE: &str = "date";

// Transactions
pub const AMOUNT: &str = "amount";
pub const CATEGORY: &str = "category";
pub const CHANNEL: &str = "channel";
pub const GENDER: &str = "gender";
pub const IS_MINE_EMPLOYEE: &str = "is_mine_employee";
pub const CUSTOMER: &str = "customer";

/// Category value that marks payroll transactions.
pub const SALARY: &str = "salary";

// SME loans
pub const SME_ID: &str = "sme_id";
pub const LOAN_AMOUNT: &str = "loan_amount";
pub const CREDIT_SCORE: &str = "credit_score";
pub const INDUSTRY: &str = "industry";
pub const REPAYMENT_STATUS: &str = "repayment_status";

/// The only columns `describe` reports frequency counts for.
pub const SUMMARIZED_CATEGORICALS: [&str; 4] = [GENDER, CATEGORY, CHANNEL, IS_MINE_EMPLOYEE];

//! Command line arguments.

use std::str::FromStr;

use clap::{Args, Parser, Subcommand, ValueEnum};
use domain::{
    AuditPolicy, CancellationPolicy, OrderStatus, ProductId, TransactionType, UserId,
};

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "invctl")]
#[command(about = "Inventory ledger and order workflow")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags that override the environment configuration.
#[derive(Debug, Default, Args)]
pub struct GlobalArgs {
    /// PostgreSQL connection URL; without one an in-memory store is used
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Name recorded on ledger entries and status changes
    #[arg(long, global = true)]
    pub operator: Option<String>,

    /// Tax rate in basis points applied when an order has no explicit tax
    #[arg(long, global = true)]
    pub tax_rate_bps: Option<u32>,

    /// Whether SHIPPED orders may be cancelled
    #[arg(long, global = true)]
    pub cancellation_policy: Option<CancellationPolicy>,

    /// What happens when a ledger entry cannot be written
    #[arg(long, global = true)]
    pub audit_policy: Option<AuditPolicy>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl GlobalArgs {
    /// Applies flags on top of `config`.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(url) = &self.database_url {
            config.database_url = Some(url.clone());
        }
        if let Some(operator) = &self.operator {
            config.operator = operator.clone();
        }
        if let Some(bps) = self.tax_rate_bps {
            config.tax_rate_bps = bps;
        }
        if let Some(policy) = self.cancellation_policy {
            config.cancellation_policy = policy;
        }
        if let Some(policy) = self.audit_policy {
            config.audit_policy = policy;
        }
        config
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage products and their stock
    #[command(subcommand)]
    Product(ProductCommand),

    /// Manage users
    #[command(subcommand)]
    User(UserCommand),

    /// Place and manage orders
    #[command(subcommand)]
    Order(OrderCommand),
}

#[derive(Debug, Subcommand)]
pub enum ProductCommand {
    /// Create a product
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        sku: String,
        /// Unit price in cents
        #[arg(long)]
        price: i64,
        /// Initial stock on hand
        #[arg(long, default_value_t = 0)]
        quantity: u32,
        #[arg(long, default_value_t = 0)]
        reorder_point: u32,
        #[arg(long, default_value_t = 0)]
        reorder_quantity: u32,
    },

    /// Show a product by id or SKU
    Show { product: String },

    /// List products
    List {
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Change the stock on hand by a signed amount
    Adjust {
        product: ProductId,
        #[arg(allow_hyphen_values = true)]
        delta: i64,
        /// Ledger entry type: ADJUSTMENT, RESTOCK, PURCHASE or DAMAGED
        #[arg(long, default_value = "ADJUSTMENT")]
        kind: TransactionType,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Return reserved units to available stock, e.g. when cancelling an
    /// order could not release them
    Release {
        product: ProductId,
        quantity: u32,
        /// Order the units were reserved for, by id or order number
        #[arg(long)]
        order: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Mark a product DISCONTINUED or COMING_SOON, or `auto` to derive
    /// the status from stock again
    SetStatus {
        product: ProductId,
        status: StatusArg,
    },

    /// Show the transaction log of a product, newest first
    History {
        product: ProductId,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show per-type totals of a product's transaction log
    Summary { product: ProductId },
}

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create a user
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },

    /// Show a user by id or email
    Show { user: String },
}

#[derive(Debug, Subcommand)]
pub enum OrderCommand {
    /// Place an order, reserving stock for every item
    Place {
        #[arg(long)]
        user: UserId,
        /// `<product-id>:<qty>[:<unit-price-cents>]`, repeatable
        #[arg(long = "item", required = true)]
        items: Vec<ItemArg>,
        /// Tax in cents; defaults to the configured rate
        #[arg(long)]
        tax: Option<i64>,
        /// Shipping cost in cents
        #[arg(long)]
        shipping: Option<i64>,
        /// Order-level discount in cents
        #[arg(long, default_value_t = 0)]
        discount: i64,
        #[arg(long, default_value = "card")]
        payment: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Show an order by id or order number
    Show { order: String },

    /// List orders, newest first
    List {
        #[arg(long)]
        user: Option<UserId>,
        #[arg(long)]
        status: Option<OrderStatus>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Move an order to another status
    Transition {
        order: String,
        status: OrderStatus,
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        carrier: Option<String>,
        #[arg(long)]
        tracking: Option<String>,
    },

    /// Cancel an order and release its stock
    Cancel {
        order: String,
        #[arg(long)]
        reason: Option<String>,
    },

    /// Show the stock movements recorded for an order, oldest first
    Ledger { order: String },
}

/// One `--item` of `order place`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemArg {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price_cents: Option<i64>,
}

impl FromStr for ItemArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let (product, quantity, price) = match parts.as_slice() {
            [product, quantity] => (*product, *quantity, None),
            [product, quantity, price] => (*product, *quantity, Some(*price)),
            _ => {
                return Err(format!(
                    "expected <product-id>:<qty>[:<unit-price-cents>], got '{s}'"
                ));
            }
        };

        Ok(Self {
            product_id: product
                .parse::<ProductId>()
                .map_err(|e| e.to_string())?,
            quantity: quantity
                .parse::<u32>()
                .map_err(|_| format!("invalid quantity '{quantity}'"))?,
            unit_price_cents: price
                .map(|p| p.parse::<i64>().map_err(|_| format!("invalid unit price '{p}'")))
                .transpose()?,
        })
    }
}

/// Target of `product set-status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusArg {
    Manual(domain::InventoryStatus),
    Auto,
}

impl FromStr for StatusArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(StatusArg::Auto);
        }
        s.parse::<domain::InventoryStatus>()
            .map(StatusArg::Manual)
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_item_with_and_without_price() {
        let id = ProductId::new();
        let plain: ItemArg = format!("{id}:3").parse().unwrap();
        assert_eq!(plain.product_id, id);
        assert_eq!(plain.quantity, 3);
        assert_eq!(plain.unit_price_cents, None);

        let priced: ItemArg = format!("{id}:2:1999").parse().unwrap();
        assert_eq!(priced.unit_price_cents, Some(1999));
    }

    #[test]
    fn test_rejects_malformed_items() {
        let id = ProductId::new();
        assert!("not-a-uuid:1".parse::<ItemArg>().is_err());
        assert!(format!("{id}").parse::<ItemArg>().is_err());
        assert!(format!("{id}:many").parse::<ItemArg>().is_err());
        assert!(format!("{id}:-1").parse::<ItemArg>().is_err());
        assert!(format!("{id}:1:2:3").parse::<ItemArg>().is_err());
    }

    #[test]
    fn test_parses_place_order() {
        let user = UserId::new();
        let user_arg = user.to_string();
        let item_arg = format!("{}:2", ProductId::new());
        let cli = Cli::try_parse_from([
            "invctl",
            "order",
            "place",
            "--user",
            user_arg.as_str(),
            "--item",
            item_arg.as_str(),
            "--address",
            "1 Main St",
            "--tax",
            "150",
        ])
        .unwrap();

        match cli.command {
            Command::Order(OrderCommand::Place {
                user: parsed,
                items,
                tax,
                payment,
                ..
            }) => {
                assert_eq!(parsed, user);
                assert_eq!(items.len(), 1);
                assert_eq!(tax, Some(150));
                assert_eq!(payment, "card");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_negative_adjustment_and_global_flags() {
        let product = ProductId::new().to_string();
        let cli = Cli::try_parse_from([
            "invctl",
            "product",
            "adjust",
            product.as_str(),
            "-5",
            "--kind",
            "damaged",
            "--operator",
            "night-shift",
            "--audit-policy",
            "fail-closed",
        ])
        .unwrap();

        assert!(matches!(
            cli.command,
            Command::Product(ProductCommand::Adjust {
                delta: -5,
                kind: TransactionType::Damaged,
                ..
            })
        ));
        let config = cli.global.apply(Config::default());
        assert_eq!(config.operator, "night-shift");
        assert_eq!(config.audit_policy, AuditPolicy::FailClosed);
    }

    #[test]
    fn test_status_arguments() {
        let cli = Cli::try_parse_from([
            "invctl",
            "order",
            "transition",
            "ORD-20240301-0001",
            "shipped",
            "--carrier",
            "UPS",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Order(OrderCommand::Transition {
                status: OrderStatus::Shipped,
                ..
            })
        ));

        assert_eq!("auto".parse::<StatusArg>(), Ok(StatusArg::Auto));
        assert_eq!(
            "coming-soon".parse::<StatusArg>(),
            Ok(StatusArg::Manual(domain::InventoryStatus::ComingSoon))
        );
        assert!("later".parse::<StatusArg>().is_err());
    }
}

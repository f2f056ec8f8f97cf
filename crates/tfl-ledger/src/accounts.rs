//! Account ledger: account creation, balance transfers, and the account index.

use std::sync::Arc;

use tfl_store::LedgerStore;
use tfl_types::{decode, Account, AccountIndex, PrimaryRecord, Record};
use tracing::{debug, warn};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::index::{IndexMaintainer, IndexReport};
use crate::txn::{fetch_primary, UnitOfWork};
use crate::validation::{
    parse_non_negative_amount, parse_positive_amount, require_non_empty, require_record_id,
};

pub struct AccountLedger {
    store: Arc<dyn LedgerStore>,
    config: Arc<LedgerConfig>,
    index: IndexMaintainer<AccountIndex>,
}

impl AccountLedger {
    pub fn new(store: Arc<dyn LedgerStore>, config: Arc<LedgerConfig>) -> Self {
        let index = IndexMaintainer::new(config.account_index_key.clone());
        Self {
            store,
            config,
            index,
        }
    }

    pub fn index(&self) -> &IndexMaintainer<AccountIndex> {
        &self.index
    }

    /// Create an account and add it to the account index.
    pub fn create_account(
        &self,
        account_number: &str,
        owner_name: &str,
        currency: &str,
        initial_balance: &str,
    ) -> LedgerResult<Account> {
        require_record_id(&self.config, "account number", account_number)?;
        require_non_empty("owner name", owner_name)?;
        require_non_empty("currency", currency)?;
        let balance = parse_non_negative_amount("initial balance", initial_balance)?;

        let mut uow = UnitOfWork::new(self.store.as_ref());
        let existing = uow.get(account_number)?;
        if self.blocks_creation(account_number, existing.as_deref()) {
            return Err(LedgerError::already_exists(Account::KIND, account_number));
        }
        let index = self.index.load(&mut uow)?;

        let owner_name = if self.config.lowercase_owner_names {
            owner_name.to_lowercase()
        } else {
            owner_name.to_string()
        };
        let account = Account::new(account_number, owner_name, currency, balance);
        uow.put(account_number, &account)?;
        self.index.stage_append(&mut uow, index, account_number)?;
        uow.commit()?;

        if self.config.verify_index_writes {
            self.index.confirm::<Account>(self.store.as_ref(), account_number)?;
        }
        debug!(account = account_number, balance = %account.balance, "account created");
        Ok(account)
    }

    /// Whether the value stored at `key` counts as an existing account.
    fn blocks_creation(&self, key: &str, existing: Option<&[u8]>) -> bool {
        let Some(bytes) = existing else {
            return false;
        };
        if self.config.strict_existence_check {
            return true;
        }
        match decode::<Account>(key, bytes) {
            Ok(account) if account.primary_key() == key => true,
            Ok(account) => {
                warn!(key, found = %account.account_number, "overwriting account filed under a foreign key");
                false
            }
            Err(e) => {
                warn!(key, error = %e, "overwriting undecodable value at account key");
                false
            }
        }
    }

    /// Move `amount` from one account to another.
    ///
    /// Both balances are written in one unit of work; the sum of the two is
    /// unchanged. Returns the updated `(from, to)` pair.
    pub fn transfer_balance(
        &self,
        from_account: &str,
        to_account: &str,
        amount: &str,
    ) -> LedgerResult<(Account, Account)> {
        require_non_empty("source account", from_account)?;
        require_non_empty("destination account", to_account)?;
        let amount = parse_positive_amount("amount", amount)?;
        if from_account == to_account {
            return Err(LedgerError::Validation(format!(
                "cannot transfer from account {from_account} to itself"
            )));
        }

        let mut uow = UnitOfWork::new(self.store.as_ref());
        let mut from = uow.load_primary::<Account>(from_account)?;
        let mut to = uow.load_primary::<Account>(to_account)?;

        if from.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                account: from_account.to_string(),
                balance: from.balance.to_string(),
                requested: amount.to_string(),
            });
        }
        // Both sides must move by exactly `amount` or the total is not conserved.
        let debited = from.balance.checked_sub(amount).ok_or_else(|| {
            LedgerError::Validation(format!(
                "debit of {amount} cannot be represented exactly in account {from_account}"
            ))
        })?;
        let credited = to.balance.checked_add(amount).ok_or_else(|| {
            LedgerError::Validation(format!(
                "credit of {amount} cannot be represented exactly in account {to_account}"
            ))
        })?;
        from.balance = debited;
        to.balance = credited;

        uow.put(from_account, &from)?;
        uow.put(to_account, &to)?;
        uow.commit()?;

        debug!(from = from_account, to = to_account, %amount, "balance transferred");
        Ok((from, to))
    }

    /// Remove an account record and its index entry.
    ///
    /// Returns `false` if no record was stored under `account_number`.
    pub fn delete_account(&self, account_number: &str) -> LedgerResult<bool> {
        require_record_id(&self.config, "account number", account_number)?;

        let mut uow = UnitOfWork::new(self.store.as_ref());
        let existed = uow.get(account_number)?.is_some();
        let index = self.index.load(&mut uow)?;
        if existed {
            uow.delete(account_number)?;
        }
        let unindexed = self.index.stage_remove(&mut uow, index, account_number)?;
        uow.commit()?;

        debug!(account = account_number, existed, unindexed, "account deleted");
        Ok(existed)
    }

    pub fn get_account(&self, account_number: &str) -> LedgerResult<Account> {
        require_non_empty("account number", account_number)?;
        fetch_primary(self.store.as_ref(), account_number)
    }

    /// Every indexed account, in index order.
    pub fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        self.index.records::<Account>(self.store.as_ref())?.collect()
    }

    pub fn verify_index(&self) -> LedgerResult<IndexReport> {
        self.index.verify::<Account>(self.store.as_ref())
    }

    pub fn rebuild_index(&self) -> LedgerResult<IndexReport> {
        self.index.rebuild::<Account>(self.store.as_ref())
    }
}
